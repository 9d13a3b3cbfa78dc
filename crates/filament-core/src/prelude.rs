pub use crate::accessor;
pub use crate::array::{LENGTH_PROPERTY, ObservableVec};
pub use crate::binding::{Binding, BindingObserver, ObserverFlags, create_binding_observer};
pub use crate::context::{ExecutionContext, with_event};
pub use crate::error::*;
pub use crate::identity::{Identity, ObjectId};
pub use crate::notify::{ChangeArgs, Notifier, PropertyChangeNotifier, Subscriber, SubscriberSet};
pub use crate::observable::{
    Accessor, AccessorInfo, ComputedAccessor, Observable, ObservableState, Observed, accessors,
    define_computed, define_property, extend, track, track_volatile, untracked,
};
pub use crate::scheduler::{
    FrameHost, has_pending_updates, next_update, process_updates, queue_update, set_frame_host,
};
pub use crate::splice::{Splice, apply_splices, calc_splices, diff, project_splices};
