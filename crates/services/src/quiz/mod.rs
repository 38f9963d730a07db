//! Quiz taking: one session per attempt, from navigation payload to
//! persisted report.

mod content;
mod state;
mod view;
mod workflow;

pub use content::{ContentSource, QuizContentLoader, cache_key};
pub use state::{QuizSession, SessionState, SubmitOutcome};
pub use view::{OptionHighlight, OptionView, QuestionView, SessionView};
pub use workflow::QuizSessionService;
