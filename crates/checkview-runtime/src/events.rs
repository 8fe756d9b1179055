/// UI notifications broadcast by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ShowAlert { message: String, show_dismiss: bool },
    HideAlert,
}

impl UiEvent {
    pub fn alert(message: impl Into<String>) -> Self {
        UiEvent::ShowAlert {
            message: message.into(),
            show_dismiss: false,
        }
    }
}
