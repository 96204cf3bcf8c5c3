// Central resource cache
//
// One mutex guards the registries, the deferred queue and the memory
// accountant. Frame data lives behind each entry's own lock so drawing never
// waits on the cache.

use super::entry::EntryState;
use super::{
    resolve, AssetEntry, AssetError, AssetLoader, DataObject, DataProcessor, DataRef,
    DecodedFrame, DeferredLoadQueue, Font, FontInfo, FontProcessor, LoadBudget, LoadMode, LoadState,
    MemoryAccountant, MemoryStats, PngProcessor, PngSequenceProcessor, ReplacementTable,
    Resolution, ResourceId, SpriteDataProcessor, SpriteHandle, SpriteProcessor, TextEncoding,
    TextTable, TxtFontProcessor,
};
use crate::engine::renderer::{PixelColor, RenderDevice};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on the frames one sprite id may declare
pub const MAX_SPRITE_FRAMES: usize = 4096;

/// Cache behavior that does not change at runtime
#[derive(Debug, Clone, Copy)]
pub struct ResourceSettings {
    /// Keep decoded sprite pixels in system memory so device loss can be
    /// recovered without decoding again. Fonts always keep theirs.
    pub retain_system_copies: bool,
    /// Work done by [`ResourceManager::run`]
    pub budget: LoadBudget,
    /// Encoding of text tables
    pub encoding: TextEncoding,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            retain_system_copies: false,
            budget: LoadBudget::default(),
            encoding: TextEncoding::utf8(),
        }
    }
}

/// Counts of cached resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetStats {
    pub sprite_count: usize,
    pub font_count: usize,
    pub data_count: usize,
    pub pending_count: usize,
}

struct CacheState {
    sprites: HashMap<ResourceId, Arc<AssetEntry>>,
    fonts: HashMap<FontInfo, Font>,
    data: HashMap<ResourceId, Arc<dyn DataObject>>,
    sprite_processors: HashMap<String, Arc<dyn SpriteProcessor>>,
    data_processors: HashMap<String, Arc<dyn DataProcessor>>,
    font_processors: HashMap<String, Arc<dyn FontProcessor>>,
    queue: DeferredLoadQueue,
    /// Entries popped from the queue and being decoded outside the lock
    in_flight: Vec<Arc<AssetEntry>>,
    memory: MemoryAccountant,
    /// Entries dropped by `reset` that still hold device memory
    detached: Vec<Arc<AssetEntry>>,
}

impl CacheState {
    /// Every entry that may own textures
    fn entries(&self) -> Vec<Arc<AssetEntry>> {
        self.sprites
            .values()
            .cloned()
            .chain(self.fonts.values().map(|font| Arc::clone(font.sprite().entry())))
            .chain(self.detached.iter().cloned())
            .collect()
    }
}

/// Frames read from a sprite source before any of them reach the device
struct DecodedSprite {
    frames: Vec<DecodedFrame>,
    failure: Option<AssetError>,
}

impl DecodedSprite {
    fn failed(error: AssetError) -> Self {
        Self {
            frames: Vec::new(),
            failure: Some(error),
        }
    }
}

#[derive(Default)]
struct TextState {
    tables: HashMap<String, TextTable>,
    arguments: Vec<(String, String)>,
}

/// Cache of sprites, fonts, data objects and text tables
///
/// All methods take `&self`; share the manager across threads with an `Arc`.
pub struct ResourceManager {
    device: Arc<dyn RenderDevice>,
    loader: AssetLoader,
    settings: ResourceSettings,
    state: Mutex<CacheState>,
    replacement: RwLock<Option<Arc<ReplacementTable>>>,
    text: Mutex<TextState>,
}

impl ResourceManager {
    pub fn new(device: Arc<dyn RenderDevice>, loader: AssetLoader) -> Self {
        Self::with_settings(device, loader, ResourceSettings::default())
    }

    /// Create a manager with the built-in `png`, `pngani` and `txt` font
    /// processors registered
    pub fn with_settings(
        device: Arc<dyn RenderDevice>,
        loader: AssetLoader,
        settings: ResourceSettings,
    ) -> Self {
        let manager = Self {
            device,
            loader,
            settings,
            state: Mutex::new(CacheState {
                sprites: HashMap::new(),
                fonts: HashMap::new(),
                data: HashMap::new(),
                sprite_processors: HashMap::new(),
                data_processors: HashMap::new(),
                font_processors: HashMap::new(),
                queue: DeferredLoadQueue::new(),
                in_flight: Vec::new(),
                memory: MemoryAccountant::new(),
                detached: Vec::new(),
            }),
            replacement: RwLock::new(None),
            text: Mutex::new(TextState::default()),
        };

        manager.add_sprite_processor("png", PngProcessor);
        manager.add_data_processor("png", SpriteDataProcessor);
        manager.add_sprite_processor("pngani", PngSequenceProcessor);
        manager.add_data_processor("pngani", SpriteDataProcessor);
        manager.add_font_processor("txt", TxtFontProcessor);
        manager
    }

    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    // Processors

    pub fn add_sprite_processor(&self, format: &str, processor: impl SpriteProcessor + 'static) {
        let format = format.to_ascii_lowercase();
        debug!("Sprite processor registered for \"{}\"", format);
        self.state
            .lock()
            .sprite_processors
            .insert(format, Arc::new(processor));
    }

    pub fn add_data_processor(&self, format: &str, processor: impl DataProcessor + 'static) {
        self.state
            .lock()
            .data_processors
            .insert(format.to_ascii_lowercase(), Arc::new(processor));
    }

    pub fn add_font_processor(&self, format: &str, processor: impl FontProcessor + 'static) {
        self.state
            .lock()
            .font_processors
            .insert(format.to_ascii_lowercase(), Arc::new(processor));
    }

    fn sprite_processor(&self, format: &str) -> Option<Arc<dyn SpriteProcessor>> {
        self.state.lock().sprite_processors.get(format).cloned()
    }

    // Replacement

    /// Load the replacement table from an INI file under the asset root, or
    /// clear it with `None`
    pub fn set_resource_replacement(&self, file: Option<&str>) -> Result<(), AssetError> {
        let table = match file.map(str::trim).filter(|f| !f.is_empty()) {
            Some(file) => Some(ReplacementTable::load(self.loader.resolve_path(file))?),
            None => None,
        };
        self.set_replacement_table(table);
        Ok(())
    }

    pub fn set_replacement_table(&self, table: Option<ReplacementTable>) {
        *self.replacement.write() = table.map(Arc::new);
    }

    /// Rewrite `id` through the replacement table. Existence checks run without
    /// holding the cache lock.
    fn resolve_id(&self, id: &ResourceId) -> Resolution {
        let table = self.replacement.read().clone();
        resolve(
            table.as_deref(),
            id,
            |candidate| self.state.lock().sprites.contains_key(candidate),
            |candidate| {
                self.sprite_processor(candidate.format())
                    .is_some_and(|p| p.exists(candidate, &self.loader))
            },
        )
    }

    // Sprites

    /// A sprite uploaded from the deferred queue
    pub fn get_image(&self, id: &str) -> Result<SpriteHandle, AssetError> {
        self.get_image_with(id, LoadMode::Deferred)
    }

    pub fn get_image_with(&self, id: &str, mode: LoadMode) -> Result<SpriteHandle, AssetError> {
        self.get_sprite(&ResourceId::parse(id), mode)
    }

    /// Look up or create the entry for `id` and hand out a new handle to it
    ///
    /// A miss registers an entry shaped by the format's processor. With
    /// [`LoadMode::Immediate`] a failed load unregisters it again and the error
    /// is returned.
    pub fn get_sprite(&self, id: &ResourceId, mode: LoadMode) -> Result<SpriteHandle, AssetError> {
        let resolved = self.resolve_id(id);

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(entry) = state.sprites.get(&resolved.id).cloned() {
            self.load_locked(state, &entry, mode)?;
            return Ok(SpriteHandle::with_requested_id(entry, id.clone()));
        }

        let processor = state
            .sprite_processors
            .get(resolved.id.format())
            .cloned()
            .ok_or_else(|| AssetError::UnsupportedFormat {
                format: resolved.id.format().to_string(),
                id: resolved.id.to_string(),
            })?;

        let layout = processor.layout(&resolved.id);
        if layout.frame_count > MAX_SPRITE_FRAMES {
            warn!(
                "\"{}\" declares {} frames, more than {}",
                resolved.id, layout.frame_count, MAX_SPRITE_FRAMES
            );
            return Err(AssetError::InvalidId(resolved.id.to_string()));
        }
        let entry = Arc::new(AssetEntry::new(
            resolved.id.clone(),
            &layout,
            resolved.resolution,
        ));
        state.sprites.insert(resolved.id.clone(), Arc::clone(&entry));

        match mode {
            LoadMode::Immediate => {
                if let Err(e) =
                    self.upload_entry(&mut state.memory, &entry, Some(processor.as_ref()), true)
                {
                    state.sprites.remove(&resolved.id);
                    return Err(e);
                }
            }
            LoadMode::Deferred => {
                state.queue.enqueue(&entry);
            }
            LoadMode::LinkOnly => {}
        }

        debug!("Registered sprite \"{}\" ({:?})", resolved.id, mode);
        Ok(SpriteHandle::with_requested_id(entry, id.clone()))
    }

    /// Bring a handle's frames to the device
    ///
    /// `Immediate` uploads now unless already resident, `Deferred` queues an
    /// unloaded entry, `LinkOnly` does nothing.
    pub fn load(&self, handle: &SpriteHandle, mode: LoadMode) -> Result<(), AssetError> {
        let mut guard = self.state.lock();
        self.load_locked(&mut guard, handle.entry(), mode)
    }

    /// Queue an unloaded handle for upload. Returns true if it was queued.
    pub fn touch(&self, handle: &SpriteHandle) -> bool {
        if handle.load_state() != LoadState::Unloaded {
            return false;
        }
        self.state.lock().queue.enqueue(handle.entry())
    }

    fn load_locked(
        &self,
        state: &mut CacheState,
        entry: &Arc<AssetEntry>,
        mode: LoadMode,
    ) -> Result<(), AssetError> {
        match mode {
            LoadMode::Immediate if !entry.is_resident() => {
                let processor = state.sprite_processors.get(entry.id().format()).cloned();
                self.upload_entry(&mut state.memory, entry, processor.as_deref(), true)?;
            }
            LoadMode::Deferred if entry.load_state() == LoadState::Unloaded => {
                state.queue.enqueue(entry);
            }
            _ => {}
        }
        Ok(())
    }

    /// Upload every frame of `entry` while the caller holds the cache lock
    ///
    /// Only the `Immediate` paths come through here; the deferred drain
    /// decodes without the lock and commits separately.
    fn upload_entry(
        &self,
        memory: &mut MemoryAccountant,
        entry: &AssetEntry,
        processor: Option<&dyn SpriteProcessor>,
        strict: bool,
    ) -> Result<usize, AssetError> {
        let decoded = self.decode_entry(entry, processor);
        let mut state = entry.write();
        self.commit_entry(memory, entry.id(), &mut state, decoded, strict)
    }

    /// Read and decode the frames of `entry`
    ///
    /// Returns `None` when every frame can be restored from its system copy.
    /// Takes no cache lock.
    fn decode_entry(
        &self,
        entry: &AssetEntry,
        processor: Option<&dyn SpriteProcessor>,
    ) -> Option<DecodedSprite> {
        let expected = {
            let state = entry.read();
            if state.all_frames_have_copies() {
                return None;
            }
            state.frames.len()
        };

        let Some(processor) = processor else {
            return Some(DecodedSprite::failed(AssetError::UnsupportedFormat {
                format: entry.id().format().to_string(),
                id: entry.id().to_string(),
            }));
        };
        let mut source = match processor.open(entry.id(), &self.loader) {
            Ok(source) => source,
            Err(e) => return Some(DecodedSprite::failed(e)),
        };

        let mut frames = Vec::new();
        while frames.len() < expected {
            match source.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => {
                    return Some(DecodedSprite {
                        frames,
                        failure: Some(e),
                    })
                }
            }
        }
        Some(DecodedSprite {
            frames,
            failure: None,
        })
    }

    /// Upload decoded frames, or restore system copies when `decoded` is
    /// `None`
    ///
    /// The entry keeps the prefix of frames that made it. An entry that got
    /// no frame at all is released and left unloaded so a later `touch` or
    /// `load` tries again; in `strict` mode that is also an error.
    fn commit_entry(
        &self,
        memory: &mut MemoryAccountant,
        id: &ResourceId,
        state: &mut EntryState,
        decoded: Option<DecodedSprite>,
        strict: bool,
    ) -> Result<usize, AssetError> {
        let Some(decoded) = decoded else {
            return self.restore_entry(memory, id, state);
        };

        let expected = state.frames.len();
        let retain = self.settings.retain_system_copies;
        let mut failure = decoded.failure;
        let mut count = 0;
        for (frame, pixels) in state.frames.iter_mut().zip(decoded.frames) {
            if let Err(e) = frame.upload(
                self.device.as_ref(),
                memory,
                pixels.size,
                &pixels.pixels,
                retain,
            ) {
                error!("Upload of \"{}\" frame {} failed: {}", id, count, e);
                failure = Some(e.into());
                break;
            }
            count += 1;
        }

        if count == 0 {
            state.release(self.device.as_ref(), memory);
            state.load_state = LoadState::Unloaded;
            let err = failure.unwrap_or_else(|| AssetError::NotFound(id.to_string()));
            if strict {
                return Err(err);
            }
            warn!("\"{}\" has no loadable frame, left unloaded: {}", id, err);
            return Ok(0);
        }

        if count < expected {
            match &failure {
                Some(e) => warn!("\"{}\" kept {} of {} frames: {}", id, count, expected, e),
                None => warn!("\"{}\" kept {} of {} frames", id, count, expected),
            }
            state.truncate(count, self.device.as_ref(), memory);
        }

        state.load_state = LoadState::Resident;
        debug!("Loaded \"{}\" ({} frames)", id, count);
        Ok(count)
    }

    fn restore_entry(
        &self,
        memory: &mut MemoryAccountant,
        id: &ResourceId,
        state: &mut EntryState,
    ) -> Result<usize, AssetError> {
        for i in 0..state.frames.len() {
            if let Err(e) = state.frames[i].restore(self.device.as_ref(), memory) {
                error!("Failed to restore \"{}\": {}", id, e);
                state.release(self.device.as_ref(), memory);
                state.load_state = LoadState::Unloaded;
                return Err(e.into());
            }
        }
        state.load_state = LoadState::Resident;
        debug!("Restored \"{}\" from system copy", id);
        Ok(state.frames.len())
    }

    // Deferred queue

    /// Drain the deferred queue with the configured budget
    pub fn run(&self) -> usize {
        self.run_with(self.settings.budget)
    }

    /// Drain the deferred queue; returns the number of entries loaded
    ///
    /// Each entry is popped under the cache lock, decoded with the lock
    /// released and committed under it again, so other threads keep using the
    /// cache while files are read.
    pub fn run_with(&self, budget: LoadBudget) -> usize {
        let started = Instant::now();
        let mut processed = 0;

        while !budget.exhausted(processed, started) {
            let (entry, processor) = {
                let mut state = self.state.lock();
                let Some(entry) = state.queue.pop() else {
                    break;
                };
                // Loaded immediately or reset while it was waiting
                if entry.load_state() != LoadState::Loading {
                    continue;
                }
                state.in_flight.push(Arc::clone(&entry));
                let processor = state.sprite_processors.get(entry.id().format()).cloned();
                (entry, processor)
            };
            processed += 1;

            let decoded = self.decode_entry(&entry, processor.as_deref());

            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.in_flight.retain(|e| !Arc::ptr_eq(e, &entry));
            let mut entry_state = entry.write();
            if entry_state.load_state != LoadState::Loading {
                debug!("Dropped decode of \"{}\"", entry.id());
                continue;
            }
            if let Err(e) =
                self.commit_entry(&mut state.memory, entry.id(), &mut entry_state, decoded, false)
            {
                error!("Deferred load of \"{}\" failed: {}", entry.id(), e);
            }
        }
        processed
    }

    /// Whether deferred work is pending
    pub fn is_loading(&self) -> bool {
        let state = self.state.lock();
        !state.queue.is_empty() || !state.in_flight.is_empty()
    }

    // Lifecycle

    /// Free every texture the cache owns
    ///
    /// System copies stay, so restored entries need no decode. Entries waiting
    /// in the queue stay queued.
    pub fn release_all(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        for entry in state.entries() {
            let mut entry_state = entry.write();
            entry_state.release(self.device.as_ref(), &mut state.memory);
            if entry_state.load_state != LoadState::Loading {
                entry_state.load_state = LoadState::Unloaded;
            }
        }
        state.detached.clear();

        if state.memory.usage() != 0 {
            warn!(
                "{} bytes still accounted after releasing all textures",
                state.memory.usage()
            );
        }
        info!("Released all textures");
    }

    /// Load again every entry that has been loaded before
    ///
    /// Placeholders that were never loaded stay placeholders. `Immediate`
    /// decodes each entry without the cache lock.
    pub fn reload_all(&self, mode: LoadMode) {
        let entries: Vec<_> = {
            let state = self.state.lock();
            state
                .sprites
                .values()
                .cloned()
                .chain(state.fonts.values().map(|font| Arc::clone(font.sprite().entry())))
                .filter(|entry| {
                    entry.with_frames(|frames| frames.iter().any(|f| f.uploaded_at().is_some()))
                })
                .collect()
        };

        match mode {
            LoadMode::Immediate => {
                for entry in &entries {
                    let processor = self.sprite_processor(entry.id().format());
                    let decoded = self.decode_entry(entry, processor.as_deref());

                    let mut state = self.state.lock();
                    let mut entry_state = entry.write();
                    if let Err(e) = self.commit_entry(
                        &mut state.memory,
                        entry.id(),
                        &mut entry_state,
                        decoded,
                        false,
                    ) {
                        error!("Reload of \"{}\" failed: {}", entry.id(), e);
                    }
                }
            }
            LoadMode::Deferred => {
                let mut state = self.state.lock();
                for entry in &entries {
                    state.queue.enqueue(entry);
                }
            }
            LoadMode::LinkOnly => {}
        }
        info!("Reloading {} entries ({:?})", entries.len(), mode);
    }

    /// Check resident textures against the device and reload everything when
    /// any was lost. Returns true if a reload was started.
    pub fn recover_lost_textures(&self) -> bool {
        let lost = {
            let state = self.state.lock();
            state.entries().iter().any(|entry| {
                entry.read().frames.iter().any(|frame| {
                    frame
                        .texture()
                        .is_some_and(|texture| !self.device.is_valid(&texture))
                })
            })
        };

        if lost {
            warn!("Device textures lost, reloading");
            self.release_all();
            self.reload_all(LoadMode::Deferred);
        }
        lost
    }

    /// Forget every cached sprite, font and data object and drop pending work
    ///
    /// Live handles keep their frames. Textures still allocated are released by
    /// the next [`release_all`](Self::release_all).
    pub fn reset(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Decodes still in flight are dropped when they come back
        for entry in state.queue.clear().into_iter().chain(state.in_flight.drain(..)) {
            entry.write().load_state = LoadState::Unloaded;
        }

        let held: Vec<_> = state
            .sprites
            .drain()
            .map(|(_, entry)| entry)
            .chain(state.fonts.drain().map(|(_, font)| Arc::clone(font.sprite().entry())))
            .filter(|entry| entry.resident_bytes() > 0)
            .collect();
        state.detached.extend(held);
        state.data.clear();

        info!("Resource cache reset");
    }

    pub fn memory(&self) -> MemoryStats {
        self.state.lock().memory.stats()
    }

    pub fn stats(&self) -> AssetStats {
        let state = self.state.lock();
        AssetStats {
            sprite_count: state.sprites.len(),
            font_count: state.fonts.len(),
            data_count: state.data.len(),
            pending_count: state.queue.len() + state.in_flight.len(),
        }
    }

    // Fonts

    /// A font without background
    pub fn get_font(&self, file: &str, fore: PixelColor) -> Result<Font, AssetError> {
        self.get_font_with_back(file, fore, PixelColor::BLACK)
    }

    /// A font colorized with `fore` over `back`
    ///
    /// Cached per file and color pair. An opaque black back color means no
    /// background.
    pub fn get_font_with_back(
        &self,
        file: &str,
        fore: PixelColor,
        back: PixelColor,
    ) -> Result<Font, AssetError> {
        let info = FontInfo::new(file, fore, back);
        let id = ResourceId::parse(&info.file);

        let processor = {
            let state = self.state.lock();
            if let Some(font) = state.fonts.get(&info) {
                return Ok(font.clone());
            }
            state
                .font_processors
                .get(id.format())
                .cloned()
                .ok_or_else(|| AssetError::UnsupportedFormat {
                    format: id.format().to_string(),
                    id: id.to_string(),
                })?
        };

        // Descriptor and sheet are read without the cache lock
        let sheet = processor.process(id.file(), &self.loader)?;
        let pixels = sheet.render(fore, info.use_back_color.then_some(back));

        let mut guard = self.state.lock();
        let state = &mut *guard;
        // Another thread may have built the same font meanwhile
        if let Some(font) = state.fonts.get(&info) {
            return Ok(font.clone());
        }
        let entry = Arc::new(AssetEntry::from_pixels(
            id.clone(),
            sheet.size,
            pixels,
            sheet.resolution,
        ));
        self.upload_entry(&mut state.memory, &entry, None, true)?;

        let font = Font::new(info.clone(), SpriteHandle::new(entry), &sheet);
        state.fonts.insert(info, font.clone());
        debug!("Loaded font \"{}\"", id);
        Ok(font)
    }

    // Data objects

    /// Look up a data object, processing it on a miss with
    /// [`LoadMode::Immediate`]
    ///
    /// Other modes return [`DataRef::Null`] on a miss.
    pub fn get_data(&self, id: &ResourceId, mode: LoadMode) -> Result<DataRef, AssetError> {
        let cached = self.state.lock().data.get(id).cloned();
        if let Some(object) = cached {
            return Ok(DataRef::Ready(object));
        }
        if mode != LoadMode::Immediate {
            return Ok(DataRef::Null(id.clone()));
        }

        let processor = self
            .state
            .lock()
            .data_processors
            .get(id.format())
            .cloned()
            .ok_or_else(|| AssetError::UnsupportedFormat {
                format: id.format().to_string(),
                id: id.to_string(),
            })?;

        let mut object = processor.process(id, self)?;
        object.post_process(self);
        let object: Arc<dyn DataObject> = Arc::from(object);

        // Another thread may have processed the same id meanwhile
        let object = Arc::clone(self.state.lock().data.entry(id.clone()).or_insert(object));
        Ok(DataRef::Ready(object))
    }

    /// Register an externally built object. Returns false and keeps the
    /// existing one if `id` is taken.
    pub fn register_data_object(&self, id: &ResourceId, object: Arc<dyn DataObject>) -> bool {
        let mut state = self.state.lock();
        if state.data.contains_key(id) {
            warn!("Data object \"{}\" already registered", id);
            return false;
        }
        state.data.insert(id.clone(), object);
        true
    }

    // Text

    /// Read a text table; `.txt` is appended when missing
    pub fn add_text_table(&self, file: &str) -> Result<(), AssetError> {
        let mut text = self.text.lock();
        self.ensure_table(&mut text, file)
    }

    fn ensure_table(&self, text: &mut TextState, file: &str) -> Result<(), AssetError> {
        if text.tables.contains_key(file) {
            return Ok(());
        }
        let path = if file.to_ascii_lowercase().ends_with(".txt") {
            file.to_string()
        } else {
            format!("{}.txt", file)
        };
        let bytes = self.loader.load_bytes(&path)?;
        let table = TextTable::from_bytes(&bytes, self.settings.encoding);
        debug!("Loaded text table \"{}\" ({} lines)", path, table.len());
        text.tables.insert(file.to_string(), table);
        Ok(())
    }

    /// Substitute `value` for every `argument` in strings returned afterwards
    pub fn add_argument(&self, argument: &str, value: impl ToString) {
        self.text
            .lock()
            .arguments
            .push((argument.to_string(), value.to_string()));
    }

    pub fn clear_arguments(&self) {
        self.text.lock().arguments.clear();
    }

    /// `file?index` moved by `shift` lines
    pub fn shift_id(&self, id: &str, shift: i64) -> String {
        ResourceId::parse(id).shift(shift).to_string()
    }

    /// One string by `file?index`; a leading `@` is ignored
    pub fn get_string(&self, id: &str) -> Result<String, AssetError> {
        let id = id.strip_prefix('@').unwrap_or(id);
        let (file, index) = split_text_id(id)?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| AssetError::InvalidId(id.to_string()))?;
        self.get_string_at(file, index)
    }

    pub fn get_string_at(&self, file: &str, index: usize) -> Result<String, AssetError> {
        let mut text = self.text.lock();
        self.ensure_table(&mut text, file)?;
        let line = text.tables[file]
            .get_string(index)
            .ok_or_else(|| AssetError::InvalidId(format!("{}?{}", file, index)))?;
        Ok(apply_arguments(&text.arguments, line))
    }

    /// A group of strings by `file?index`, or `file?sK` for the group after
    /// the K-th marker
    pub fn get_strings(&self, id: &str) -> Result<Vec<String>, AssetError> {
        let (file, index) = split_text_id(id)?;
        let index = index.trim();
        let invalid = || AssetError::InvalidId(id.to_string());

        let start = match index.strip_prefix(|c: char| c.eq_ignore_ascii_case(&'s')) {
            Some(section) => {
                let section = section.parse().map_err(|_| invalid())?;
                let mut text = self.text.lock();
                self.ensure_table(&mut text, file)?;
                text.tables[file].section_start(section)
            }
            None => index.parse().map_err(|_| invalid())?,
        };
        self.get_strings_at(file, start)
    }

    pub fn get_strings_at(&self, file: &str, start: usize) -> Result<Vec<String>, AssetError> {
        let mut text = self.text.lock();
        self.ensure_table(&mut text, file)?;
        let arguments = &text.arguments;
        Ok(text.tables[file]
            .get_strings(start)
            .into_iter()
            .map(|line| apply_arguments(arguments, line))
            .collect())
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
        info!("Peak texture memory: {} KiB", self.memory().peak / 1024);
    }
}

fn split_text_id(id: &str) -> Result<(&str, &str), AssetError> {
    id.rsplit_once('?')
        .ok_or_else(|| AssetError::InvalidId(id.to_string()))
}

fn apply_arguments(arguments: &[(String, String)], line: String) -> String {
    arguments
        .iter()
        .fold(line, |line, (argument, value)| line.replace(argument.as_str(), value))
}
