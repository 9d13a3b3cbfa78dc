use std::rc::Rc;

/// Address identity of an object taking part in change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr as *const () as usize)
    }

    pub fn addr(self) -> usize {
        self.0
    }
}

/// Identity comparison used for change detection and list diffing.
///
/// Shared handles compare by pointer, plain values by value. Nothing is ever
/// compared structurally: two distinct `Rc`s holding equal data are different.
pub trait Identity {
    fn identical(&self, other: &Self) -> bool;

    /// The observable object behind this value, if it is a shared handle.
    fn object_id(&self) -> Option<ObjectId> {
        None
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }

    fn object_id(&self) -> Option<ObjectId> {
        Some(ObjectId::of(Rc::as_ptr(self)))
    }
}

impl<T: Identity> Identity for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn object_id(&self) -> Option<ObjectId> {
        self.as_ref().and_then(Identity::object_id)
    }
}

macro_rules! value_identity {
    ($($t:ty),* $(,)?) => {
        $(
            impl Identity for $t {
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

value_identity!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);
