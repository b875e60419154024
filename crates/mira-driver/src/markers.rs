//! DOM markers the application under test exposes to automation.

/// Welcome screen shown before any conversation starts.
pub const WELCOME_SCREEN: &str = ".welcome-screen";
/// Welcome title, used by health checks.
pub const WELCOME_TITLE: &str = ".welcome-title";
/// "Buscar propiedades para comprar" button that opens the chat.
pub const PRIMARY_OPTION_BUTTON: &str = ".option-button.primary";
/// Chat screen container.
pub const CHAT_SCREEN: &str = ".chat-screen";
/// Text input for user utterances.
pub const CHAT_INPUT: &str = "#chatInput";
/// Send button next to the chat input.
pub const SEND_BUTTON: &str = "#sendButton";
/// Most recent assistant message in the transcript.
pub const LAST_ASSISTANT_MESSAGE: &str = ".message.assistant:last-child";
/// Loading indicator shown while a background search is active.
pub const SEARCH_LOADING: &str = "#searchLoadingMessage";
/// Status text inside the loading indicator.
pub const SEARCH_LOADING_TEXT: &str = "#searchMessageText";
/// Container that appears once callback results are rendered.
pub const PROPERTIES_CONTAINER: &str = ".properties-container";
/// One element per rendered property result.
pub const PROPERTY_THUMBNAIL: &str = ".property-thumbnail";
