use crate::core::model::JobKind;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    StatusChanged { text: String },
    SpinnerToggled { visible: bool },
    Progress { kind: JobKind, percent: u8 },
    ResultsRendered { rows: usize, summary: Vec<(String, usize)> },
    /// Blocking notification; the front end must show it to the user.
    Notify { message: String },
    ModalChanged { open: bool },
    Error { scope: String, message: String },
}
