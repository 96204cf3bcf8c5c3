// Processed data objects cached by resource id

use super::{AssetError, LoadMode, ResourceId, ResourceManager, SpriteHandle};
use std::any::Any;
use std::sync::Arc;

/// Upcast helper so cached objects can be downcast to their concrete type
pub trait AsAny {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Any processed record stored in the data registry
pub trait DataObject: AsAny + Send + Sync {
    /// Called once after processing, before the object is cached
    fn post_process(&mut self, _manager: &ResourceManager) {}
}

/// Builds a data object for one format
pub trait DataProcessor: Send + Sync {
    fn process(
        &self,
        id: &ResourceId,
        manager: &ResourceManager,
    ) -> Result<Box<dyn DataObject>, AssetError>;
}

/// Result of a data lookup
#[derive(Clone)]
pub enum DataRef {
    Ready(Arc<dyn DataObject>),
    /// Not loaded; callers treat it as not yet available
    Null(ResourceId),
}

impl DataRef {
    pub fn is_null(&self) -> bool {
        matches!(self, DataRef::Null(_))
    }

    pub fn object(&self) -> Option<&Arc<dyn DataObject>> {
        match self {
            DataRef::Ready(obj) => Some(obj),
            DataRef::Null(_) => None,
        }
    }

    /// The object as its concrete type
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.object()?.clone().into_any().downcast::<T>().ok()
    }
}

impl std::fmt::Debug for DataRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataRef::Ready(_) => f.write_str("DataRef::Ready(..)"),
            DataRef::Null(id) => write!(f, "DataRef::Null({})", id),
        }
    }
}

/// A sprite exposed through the data registry
#[derive(Debug, Clone)]
pub struct SpriteData {
    pub sprite: SpriteHandle,
}

impl DataObject for SpriteData {}

/// Data processor that wraps a sprite, loading it right away
#[derive(Debug, Default, Clone, Copy)]
pub struct SpriteDataProcessor;

impl DataProcessor for SpriteDataProcessor {
    fn process(
        &self,
        id: &ResourceId,
        manager: &ResourceManager,
    ) -> Result<Box<dyn DataObject>, AssetError> {
        let sprite = manager.get_sprite(id, LoadMode::Immediate)?;
        Ok(Box::new(SpriteData { sprite }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Palette(Vec<u32>);

    impl DataObject for Palette {}

    #[test]
    fn test_downcast_ready() {
        let data = DataRef::Ready(Arc::new(Palette(vec![1, 2, 3])));
        assert!(!data.is_null());

        let palette = data.downcast::<Palette>().unwrap();
        assert_eq!(palette.0, vec![1, 2, 3]);
        assert!(data.downcast::<SpriteData>().is_none());
    }

    #[test]
    fn test_null_has_no_object() {
        let data = DataRef::Null(ResourceId::parse("map.dat"));
        assert!(data.is_null());
        assert!(data.object().is_none());
        assert!(data.downcast::<Palette>().is_none());
        assert_eq!(format!("{:?}", data), "DataRef::Null(map.dat)");
    }
}
