//! The scene-object capability contract.
//!
//! Anything that wants to travel through the codec implements
//! [`SceneObject`]: a stable type name, a field-write pass, and a
//! field-read pass. Objects are held behind [`ObjectRef`] so a graph can
//! alias and cycle freely; identity is `Rc` pointer identity.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::error::{LoadError, SaveError};
use crate::input_capsule::InputCapsule;
use crate::output_capsule::OutputCapsule;

/// A polymorphic, serializable object.
///
/// `write` receives a capsule bound to this object's document node for the
/// duration of the call; `read` mirrors it on import. Capsules are borrowed
/// handles and cannot be retained past the call.
pub trait SceneObject: Any {
    /// Stable, fully-qualified type name; doubles as the registry key and
    /// the document class key.
    fn type_name(&self) -> &'static str;

    fn write(&self, out: &mut OutputCapsule<'_, '_>) -> Result<(), SaveError>;

    fn read(&mut self, input: &mut InputCapsule<'_, '_>) -> Result<(), LoadError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl std::fmt::Debug for dyn SceneObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObject")
            .field("type", &self.type_name())
            .finish()
    }
}

/// Shared handle to a scene object. Two `ObjectRef`s to the same allocation
/// are the same object for serialization purposes.
pub type ObjectRef = Rc<RefCell<dyn SceneObject>>;

/// Wrap a concrete object into a graph handle.
pub fn object_ref<T: SceneObject>(object: T) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

/// Borrow the concrete type behind a handle, if it matches.
pub fn downcast_ref<T: SceneObject>(object: &ObjectRef) -> Option<Ref<'_, T>> {
    Ref::filter_map(object.borrow(), |o| o.as_any().downcast_ref::<T>()).ok()
}

/// Mutably borrow the concrete type behind a handle, if it matches.
pub fn downcast_mut<T: SceneObject>(object: &ObjectRef) -> Option<RefMut<'_, T>> {
    RefMut::filter_map(object.borrow_mut(), |o| o.as_any_mut().downcast_mut::<T>()).ok()
}

/// Address of the object behind a handle, used as the write-side identity key.
pub(crate) fn identity(object: &ObjectRef) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

pub(crate) fn same_object(a: Option<&ObjectRef>, b: Option<&ObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
