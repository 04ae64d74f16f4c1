pub mod config;
pub mod entry;
pub mod task;
pub mod value;
pub mod verification;

pub use config::{
    ChildRuleConfig, ChooserConfig, Config, DatabaseConfig, LoggingConfig, TaskTypeConfig,
    VerificationConfig,
};
pub use entry::{Document, Entry};
pub use task::{ChildTask, Task, TaskState};
pub use value::{Scalar, Shape, Value};
pub use verification::{Decision, Outcome, Reconciled};
