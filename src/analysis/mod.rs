pub mod prompt;
pub mod response;
pub mod score;
pub mod types;

pub use prompt::{build_analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
pub use response::{interpret_reply, AnalysisReply, InterpretError, ParseError, ValidationError};
pub use score::reproducibility_score;
pub use types::{
    AnalysisData, AnalysisDocument, DependencyChange, FoundFile, Issue, IssueCategory, Severity,
    Vulnerability,
};
