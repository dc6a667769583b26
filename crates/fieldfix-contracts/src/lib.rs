pub mod chat;
pub mod decode;
pub mod error;
pub mod events;
pub mod models;
pub mod problem;
pub mod prompt;
pub mod record;
pub mod safety;
pub mod session;

pub use error::{AssessmentError, AssessmentErrorKind};
pub use problem::{Domain, ImageAttachment, Language, ProblemRequest};
pub use record::{BomItem, BomPriority, DiagnosticNode, SolutionRecord, SolveResult};
pub use safety::SafetyClassifier;
pub use session::{RecordOutcome, SessionStore, SolveTicket};
