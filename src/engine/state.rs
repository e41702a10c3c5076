/// How a command ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Changes were applied; names of the affected projects.
    Completed { changed: Vec<String> },
    /// Everything already matched; nothing was written.
    NothingToDo,
    /// The user turned the plan down at the confirmation prompt.
    Declined,
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Completed { .. } => "Done.",
            Outcome::NothingToDo => "Nothing to do, everything is up to date.",
            Outcome::Declined => "Okay, nothing was changed.",
        }
    }
}
