pub mod declarative_task_type;
pub mod keyed_locks;
pub mod progress;
pub mod reconciliation;
pub mod task_service;
pub mod task_type_registry;
pub mod verification;

pub use declarative_task_type::DeclarativeTaskType;
pub use keyed_locks::KeyedLocks;
pub use progress::{own_progress, total_progress, ProgressAggregator};
pub use reconciliation::{
    reconcile_payloads, OrderedSequenceReconciler, ScalarReconciler, StructuredReconciler,
    UnanimousReconciler,
};
pub use task_service::TaskService;
pub use task_type_registry::TaskTypeRegistry;
pub use verification::VerificationService;
