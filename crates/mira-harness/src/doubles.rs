//! In-process double of the chat client under test.
//!
//! Models just enough client behavior for the scenario suites to exercise the
//! orchestration pipeline without a browser: welcome/chat screens, scripted
//! assistant replies, the searching state, and a polling consumer that renders
//! pending callback rows from the shared store and flips their pending flag.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mira_core::current_unix_timestamp_ms;
use mira_driver::{markers, ConsoleLine, DriverError, DriverResult, NetworkConditions, PageDriver, SelectorState};
use mira_storage::MemoryCallbackStore;
use serde_json::{json, Value};

const POLL_TICK_MS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Welcome,
    Chat,
}

#[derive(Debug)]
struct ClientState {
    screen: Screen,
    pending_input: String,
    assistant_reply: Option<String>,
    scripted_replies: HashMap<String, String>,
    confirmation_messages: Vec<String>,
    assistant_muted: bool,
    searching: bool,
    rendered_count: usize,
    console: Vec<ConsoleLine>,
    network: NetworkConditions,
    suppress_delivery: bool,
    polling_announced: bool,
}

impl ClientState {
    fn new() -> Self {
        Self {
            screen: Screen::Welcome,
            pending_input: String::new(),
            assistant_reply: None,
            scripted_replies: canonical_replies(),
            confirmation_messages: vec![
                "Sí, confirmo la búsqueda".to_string(),
                "Perfecto, busca con estos nuevos criterios".to_string(),
                "Sí, busca con terraza incluida".to_string(),
            ],
            assistant_muted: false,
            searching: false,
            rendered_count: 0,
            console: Vec::new(),
            network: NetworkConditions::restored(),
            suppress_delivery: false,
            polling_announced: false,
        }
    }

    fn log(&mut self, level: &str, text: &str) {
        self.console.push(ConsoleLine {
            level: level.to_string(),
            text: text.to_string(),
            timestamp_ms: current_unix_timestamp_ms(),
        });
    }
}

fn canonical_replies() -> HashMap<String, String> {
    [
        (
            "Quiero buscar un piso en Madrid",
            "He iniciado tu búsqueda de pisos en Madrid",
        ),
        (
            "Busco 2 habitaciones, máximo 300.000 euros",
            "He anotado tus criterios: 2 habitaciones y máximo 300.000 euros",
        ),
        (
            "Sí, confirmo la búsqueda",
            "Perfecto, confirmo la búsqueda y empiezo a buscar",
        ),
        (
            "Me gustan pero quiero algo más céntrico",
            "Entendido, buscaré algo más céntrico",
        ),
        (
            "Perfecto, busca con estos nuevos criterios",
            "Lanzando la búsqueda con los nuevos criterios",
        ),
        (
            "Ahora quiero también que tenga terraza",
            "Añadido a los criterios: terraza",
        ),
        (
            "Sí, busca con terraza incluida",
            "Buscando propiedades con terraza incluida",
        ),
    ]
    .into_iter()
    .map(|(message, reply)| (message.to_string(), reply.to_string()))
    .collect()
}

/// Scripted [`PageDriver`] emulating the client under test against a
/// [`MemoryCallbackStore`].
pub struct ScriptedClientPage {
    session_id: String,
    store: MemoryCallbackStore,
    state: Mutex<ClientState>,
}

impl ScriptedClientPage {
    pub fn new(session_id: impl Into<String>, store: MemoryCallbackStore) -> Self {
        Self {
            session_id: session_id.into(),
            store,
            state: Mutex::new(ClientState::new()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ClientState> {
        self.state.lock().expect("scripted client lock")
    }

    /// Overrides the assistant reply for one user message.
    pub fn script_reply(&self, user_message: &str, reply: &str) {
        self.state()
            .scripted_replies
            .insert(user_message.to_string(), reply.to_string());
    }

    /// Makes the assistant stop replying entirely (step-timeout scenarios).
    pub fn mute_assistant(&self) {
        self.state().assistant_muted = true;
    }

    /// Keeps the client from rendering callbacks even when rows exist
    /// (delivery-timeout scenarios that do inject).
    pub fn suppress_delivery(&self) {
        self.state().suppress_delivery = true;
    }

    /// Registers an additional utterance that puts the client into its
    /// searching state when sent.
    pub fn arm_confirmation(&self, user_message: &str) {
        self.state()
            .confirmation_messages
            .push(user_message.to_string());
    }

    pub fn searching(&self) -> bool {
        self.state().searching
    }

    /// One polling cycle of the client's fallback consumer: log the activity,
    /// then consume the oldest pending row for this session if the network is
    /// up and delivery is not suppressed.
    fn client_poll(&self) -> bool {
        let mut state = self.state();
        if !state.polling_announced {
            state.polling_announced = true;
            state.log("info", "Activando polling de respaldo para callbacks");
        }
        state.log("debug", "Haciendo polling de callbacks pendientes");
        if state.network.offline || state.suppress_delivery {
            return state.rendered_count > 0;
        }
        let pending = self
            .store
            .records_for_session(&self.session_id)
            .into_iter()
            .find(|record| record.pending);
        if let Some(record) = pending {
            self.store.mark_processed(record.id);
            let rendered = record.payload.property_count();
            state.rendered_count = rendered;
            state.searching = false;
            state.log(
                "info",
                &format!("Callback {} renderizado con {rendered} propiedades", record.id),
            );
        }
        state.rendered_count > 0
    }

    async fn wait_until(
        &self,
        what: &str,
        timeout_ms: u64,
        mut predicate: impl FnMut(&Self) -> bool,
    ) -> DriverResult<()> {
        let deadline = current_unix_timestamp_ms() + timeout_ms;
        loop {
            if predicate(self) {
                return Ok(());
            }
            if current_unix_timestamp_ms() >= deadline {
                return Err(DriverError::Timeout {
                    what: what.to_string(),
                    timeout_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(POLL_TICK_MS)).await;
        }
    }

    fn send_message(&self) {
        let mut state = self.state();
        let message = std::mem::take(&mut state.pending_input);
        state.assistant_reply = if state.assistant_muted {
            None
        } else {
            Some(
                state
                    .scripted_replies
                    .get(&message)
                    .cloned()
                    .unwrap_or_else(|| format!("Recibido: {message}")),
            )
        };
        if state.confirmation_messages.contains(&message) {
            state.searching = true;
            state.rendered_count = 0;
            state.log("info", "Estado de búsqueda activado, esperando resultados");
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedClientPage {
    async fn navigate(&self, _url: &str) -> DriverResult<()> {
        let mut state = self.state();
        let replies = std::mem::take(&mut state.scripted_replies);
        let confirmations = std::mem::take(&mut state.confirmation_messages);
        let muted = state.assistant_muted;
        let suppressed = state.suppress_delivery;
        // Network emulation persists across reloads, as it does for a real
        // browser context.
        let network = state.network;
        *state = ClientState::new();
        state.scripted_replies = replies;
        state.confirmation_messages = confirmations;
        state.assistant_muted = muted;
        state.suppress_delivery = suppressed;
        state.network = network;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> DriverResult<()> {
        if selector != markers::CHAT_INPUT {
            return Err(DriverError::Other(format!("unknown input {selector}")));
        }
        self.state().pending_input = text.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        match selector {
            markers::PRIMARY_OPTION_BUTTON => {
                self.state().screen = Screen::Chat;
                Ok(())
            }
            markers::SEND_BUTTON => {
                self.send_message();
                Ok(())
            }
            other => Err(DriverError::Other(format!("unknown control {other}"))),
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: SelectorState,
        timeout_ms: u64,
    ) -> DriverResult<()> {
        match (selector, state) {
            (markers::CHAT_SCREEN, SelectorState::Visible) => {
                self.wait_until(selector, timeout_ms, |page| {
                    page.state().screen == Screen::Chat
                })
                .await
            }
            (markers::WELCOME_SCREEN, SelectorState::Visible) => {
                self.wait_until(selector, timeout_ms, |page| {
                    page.state().screen == Screen::Welcome
                })
                .await
            }
            (markers::LAST_ASSISTANT_MESSAGE, SelectorState::Visible) => {
                self.wait_until(selector, timeout_ms, |page| {
                    page.state().assistant_reply.is_some()
                })
                .await
            }
            (markers::SEARCH_LOADING, SelectorState::Visible) => {
                self.wait_until(selector, timeout_ms, |page| page.state().searching)
                    .await
            }
            (markers::SEARCH_LOADING, SelectorState::Hidden) => {
                self.wait_until(selector, timeout_ms, |page| !page.state().searching)
                    .await
            }
            (markers::PROPERTIES_CONTAINER, SelectorState::Visible) => {
                self.wait_until(selector, timeout_ms, |page| page.client_poll())
                    .await
            }
            (other, _) => Err(DriverError::Other(format!("unscripted selector {other}"))),
        }
    }

    async fn text_content(&self, selector: &str) -> DriverResult<String> {
        match selector {
            markers::LAST_ASSISTANT_MESSAGE => self
                .state()
                .assistant_reply
                .clone()
                .ok_or_else(|| DriverError::Other("no assistant message yet".to_string())),
            markers::SEARCH_LOADING_TEXT => Ok("Buscando propiedades...".to_string()),
            other => Err(DriverError::Other(format!("unscripted selector {other}"))),
        }
    }

    async fn count(&self, selector: &str) -> DriverResult<usize> {
        if selector == markers::PROPERTY_THUMBNAIL {
            Ok(self.state().rendered_count)
        } else {
            Err(DriverError::Other(format!("unscripted selector {selector}")))
        }
    }

    async fn is_visible(&self, selector: &str) -> DriverResult<bool> {
        let state = self.state();
        Ok(match selector {
            markers::WELCOME_SCREEN | markers::WELCOME_TITLE => state.screen == Screen::Welcome,
            markers::CHAT_SCREEN => state.screen == Screen::Chat,
            markers::SEARCH_LOADING => state.searching,
            markers::PROPERTIES_CONTAINER => state.rendered_count > 0,
            _ => false,
        })
    }

    async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
        if expression.contains("navigator.userAgent") {
            return Ok(json!("mira-scripted-client/1.0"));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        // PNG signature only; enough for attachment plumbing.
        Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
    }

    async fn emulate_network(&self, conditions: &NetworkConditions) -> DriverResult<()> {
        self.state().network = *conditions;
        Ok(())
    }

    async fn drain_console(&self) -> DriverResult<Vec<ConsoleLine>> {
        Ok(std::mem::take(&mut self.state().console))
    }
}

#[cfg(test)]
mod tests {
    use mira_driver::{markers, NetworkConditions, PageDriver, SelectorState};
    use mira_storage::{CallbackStore, MemoryCallbackStore};

    use super::ScriptedClientPage;
    use crate::payloads::payload_for_iteration;

    #[tokio::test]
    async fn functional_confirmation_message_enters_searching_state() {
        let page = ScriptedClientPage::new("s1", MemoryCallbackStore::new());
        page.click(markers::PRIMARY_OPTION_BUTTON).await.expect("open chat");
        page.fill(markers::CHAT_INPUT, "Sí, confirmo la búsqueda")
            .await
            .expect("fill");
        page.click(markers::SEND_BUTTON).await.expect("send");
        assert!(page.searching());
        page.wait_for_selector(markers::SEARCH_LOADING, SelectorState::Visible, 100)
            .await
            .expect("loading visible");
    }

    #[tokio::test]
    async fn functional_client_consumes_pending_row_and_renders_it() {
        let store = MemoryCallbackStore::new();
        let page = ScriptedClientPage::new("s1", store.clone());
        let payload = payload_for_iteration(1).expect("payload");
        let id = store.insert_callback("s1", &payload).await.expect("insert");

        page.wait_for_selector(markers::PROPERTIES_CONTAINER, SelectorState::Visible, 1_000)
            .await
            .expect("delivery");
        assert_eq!(page.count(markers::PROPERTY_THUMBNAIL).await.expect("count"), 2);
        assert!(!store.callback_pending(id).await.expect("pending read"));

        let console = page.drain_console().await.expect("console");
        assert!(console.iter().any(|line| line.text.contains("polling")));
    }

    #[tokio::test]
    async fn regression_offline_client_does_not_consume_rows() {
        let store = MemoryCallbackStore::new();
        let page = ScriptedClientPage::new("s1", store.clone());
        page.emulate_network(&NetworkConditions::offline())
            .await
            .expect("offline");
        let payload = payload_for_iteration(1).expect("payload");
        let id = store.insert_callback("s1", &payload).await.expect("insert");

        let error = page
            .wait_for_selector(markers::PROPERTIES_CONTAINER, SelectorState::Visible, 200)
            .await
            .expect_err("offline must not deliver");
        assert!(error.is_timeout());
        assert!(store.callback_pending(id).await.expect("pending read"));

        // Back online, delivery resumes.
        page.emulate_network(&NetworkConditions::restored())
            .await
            .expect("restore");
        page.wait_for_selector(markers::PROPERTIES_CONTAINER, SelectorState::Visible, 1_000)
            .await
            .expect("delivery after restore");
    }

    #[tokio::test]
    async fn regression_cross_session_rows_stay_invisible() {
        let store = MemoryCallbackStore::new();
        let page = ScriptedClientPage::new("session_a", store.clone());
        let payload = payload_for_iteration(2).expect("payload");
        store
            .insert_callback("session_b", &payload)
            .await
            .expect("insert foreign row");

        let error = page
            .wait_for_selector(markers::PROPERTIES_CONTAINER, SelectorState::Visible, 200)
            .await
            .expect_err("foreign session row must not render");
        assert!(error.is_timeout());
        assert_eq!(page.count(markers::PROPERTY_THUMBNAIL).await.expect("count"), 0);
    }
}
