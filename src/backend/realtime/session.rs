/**
 * Connection Session
 *
 * Per-connection protocol state machine, independent of the transport:
 * the WebSocket handler feeds it text messages and forwards whatever it
 * puts on the outbound queue.
 *
 * # States
 *
 * ```text
 * Unauthenticated --CONNECT ok--> Authenticated --DISCONNECT/close--> Closed
 *        |                                                              ^
 *        +-------- CONNECT rejected / other frame first ----------------+
 * ```
 *
 * Under the anonymous handshake policy a failed CONNECT is acknowledged and
 * the session stays `Unauthenticated` with the handshake complete.
 *
 * # Subscriptions
 *
 * Every SUBSCRIBE spawns one forwarding task draining the destination's
 * broadcast ring into the bounded outbound queue. A lagging forwarder skips
 * what it missed; other subscriptions are not affected.
 */

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::auth::principal::Principal;
use crate::backend::chat::service::ChatService;
use crate::backend::error::BackendError;
use crate::backend::realtime::authorizer::DestinationAuthorizer;
use crate::backend::realtime::gatekeeper::{Gatekeeper, HandshakeOutcome};
use crate::backend::realtime::registry::{ConnectionId, Delivery};
use crate::backend::realtime::router::BroadcastRouter;
use crate::backend::server::state::AppState;
use crate::shared::{Command, Destination, Frame};

/// Collaborators shared by every connection
#[derive(Clone)]
pub struct RealtimeContext {
    pub gatekeeper: Gatekeeper,
    pub authorizer: DestinationAuthorizer,
    pub router: BroadcastRouter,
    pub chat: ChatService,
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,
}

impl RealtimeContext {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            gatekeeper: Gatekeeper::new(
                state.tokens.clone(),
                state.pool.clone(),
                state.config.handshake_policy,
            ),
            authorizer: DestinationAuthorizer::new(state.pool.clone()),
            router: state.router.clone(),
            chat: state.chat_service(),
            outbound_capacity: state.config.outbound_capacity.max(1),
        }
    }
}

/// What the transport should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Unauthenticated,
    Authenticated(Principal),
    Closed,
}

/// Body of a chat SEND
#[derive(Debug, Deserialize)]
struct ChatSendBody {
    content: String,
}

/// Protocol state of one realtime connection
pub struct ConnectionSession {
    id: ConnectionId,
    state: SessionState,
    handshake_complete: bool,
    subscriptions: HashMap<String, JoinHandle<()>>,
    outbound: mpsc::Sender<Frame>,
    ctx: Arc<RealtimeContext>,
}

impl ConnectionSession {
    /// Create a session and register it with the subscriber registry
    pub fn new(ctx: Arc<RealtimeContext>, outbound: mpsc::Sender<Frame>) -> Self {
        let id = Uuid::new_v4();
        ctx.router.registry().register(id);

        Self {
            id,
            state: SessionState::Unauthenticated,
            handshake_complete: false,
            subscriptions: HashMap::new(),
            outbound,
            ctx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Authenticated principal, if any
    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Handle one text message from the transport
    pub async fn handle_text(&mut self, text: &str) -> Flow {
        match Frame::parse(text) {
            Ok(Some(frame)) => self.handle_frame(frame).await,
            Ok(None) => Flow::Continue,
            Err(err) => {
                tracing::warn!("[Realtime] Connection {} sent a malformed frame: {}", self.id, err);
                self.emit(Frame::error(format!("Malformed frame: {}", err), None))
                    .await;
                if self.handshake_complete {
                    Flow::Continue
                } else {
                    Flow::Close
                }
            }
        }
    }

    /// Handle one parsed frame
    pub async fn handle_frame(&mut self, frame: Frame) -> Flow {
        if self.is_closed() {
            return Flow::Close;
        }
        if !self.handshake_complete {
            return self.handshake(frame).await;
        }

        if frame.command.is_handshake() {
            self.emit(Frame::error("Already connected", frame.receipt()))
                .await;
            return Flow::Continue;
        }

        let destination = match self
            .ctx
            .authorizer
            .authorize(self.principal(), &frame)
            .await
        {
            Ok(destination) => destination,
            Err(err) => {
                tracing::debug!(
                    "[Realtime] Connection {} denied {}: {}",
                    self.id,
                    frame.command,
                    err
                );
                self.reject(&err, frame.receipt()).await;
                return Flow::Continue;
            }
        };

        let result = match (frame.command, destination) {
            (Command::Disconnect, _) => {
                if let Some(receipt) = frame.receipt() {
                    self.emit(Frame::receipt_for(receipt)).await;
                }
                tracing::info!("[Realtime] Connection {} disconnected", self.id);
                return Flow::Close;
            }
            (Command::Subscribe, Some(destination)) => self.subscribe(&frame, destination),
            (Command::Send, Some(Destination::ChatSend(project_id))) => {
                self.send_chat(project_id, &frame.body).await
            }
            (Command::Send, Some(Destination::ChatJoin(project_id))) => {
                self.join_chat(project_id).await
            }
            _ => Ok(()),
        };

        match result {
            Ok(()) => {
                if let Some(receipt) = frame.receipt() {
                    self.emit(Frame::receipt_for(receipt)).await;
                }
            }
            Err(err) => self.reject(&err, frame.receipt()).await,
        }
        Flow::Continue
    }

    async fn handshake(&mut self, frame: Frame) -> Flow {
        if !frame.command.is_handshake() {
            tracing::warn!(
                "[Realtime] Connection {} sent {} before CONNECT",
                self.id,
                frame.command
            );
            self.emit(Frame::error("Expected CONNECT", None)).await;
            return Flow::Close;
        }

        match self.ctx.gatekeeper.handshake(&frame).await {
            HandshakeOutcome::Accepted(principal) => {
                self.ctx.router.registry().bind(self.id, principal.id);
                let connected = Frame::connected(Some(&principal.username));
                self.state = SessionState::Authenticated(principal);
                self.handshake_complete = true;
                self.emit(connected).await;
                Flow::Continue
            }
            HandshakeOutcome::Anonymous => {
                self.handshake_complete = true;
                self.emit(Frame::connected(None)).await;
                Flow::Continue
            }
            HandshakeOutcome::Rejected => {
                self.emit(Frame::error("Authentication failed", frame.receipt()))
                    .await;
                Flow::Close
            }
        }
    }

    fn subscribe(&mut self, frame: &Frame, destination: Destination) -> Result<(), BackendError> {
        let subscription_id = frame
            .get("id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BackendError::validation("id", "Subscription id is required"))?
            .to_string();

        if self.subscriptions.contains_key(&subscription_id) {
            return Err(BackendError::validation(
                "id",
                format!("Subscription id {} is already in use", subscription_id),
            ));
        }

        let rx = self
            .ctx
            .router
            .registry()
            .subscribe(self.id, &subscription_id, destination);
        let forwarder = tokio::spawn(forward(
            self.id,
            subscription_id.clone(),
            rx,
            self.outbound.clone(),
        ));
        self.subscriptions.insert(subscription_id.clone(), forwarder);

        tracing::debug!(
            "[Realtime] Connection {} subscribed to {} as {}",
            self.id,
            destination,
            subscription_id
        );
        Ok(())
    }

    async fn send_chat(&self, project_id: i64, body: &str) -> Result<(), BackendError> {
        let principal = self.principal().ok_or(BackendError::AuthenticationFailure)?;
        let body: ChatSendBody = serde_json::from_str(body)
            .map_err(|_| BackendError::validation("content", "Body must be {\"content\": string}"))?;

        self.ctx
            .chat
            .send_message(project_id, principal, &body.content)
            .await?;
        Ok(())
    }

    async fn join_chat(&self, project_id: i64) -> Result<(), BackendError> {
        let principal = self.principal().ok_or(BackendError::AuthenticationFailure)?;
        self.ctx.chat.announce_join(project_id, principal).await?;
        Ok(())
    }

    async fn reject(&self, err: &BackendError, receipt: Option<&str>) {
        self.emit(Frame::error(err.message(), receipt)).await;
    }

    async fn emit(&self, frame: Frame) {
        if self.outbound.send(frame).await.is_err() {
            tracing::debug!("[Realtime] Connection {} outbound queue closed", self.id);
        }
    }

    /// Tear the session down
    ///
    /// Forwarders are aborted and awaited, then the connection leaves the
    /// registry. The caller drops the session afterwards, which releases the
    /// outbound sender.
    pub async fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = SessionState::Closed;

        for (_, forwarder) in self.subscriptions.drain() {
            forwarder.abort();
            let _ = forwarder.await;
        }
        self.ctx.router.registry().unregister(self.id);
        tracing::debug!("[Realtime] Connection {} closed", self.id);
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        for (_, forwarder) in self.subscriptions.drain() {
            forwarder.abort();
        }
        self.ctx.router.registry().unregister(self.id);
    }
}

/// Drain one subscription's ring into the connection's outbound queue
async fn forward(
    connection: ConnectionId,
    subscription_id: String,
    mut rx: broadcast::Receiver<Arc<Delivery>>,
    outbound: mpsc::Sender<Frame>,
) {
    loop {
        match rx.recv().await {
            Ok(delivery) => {
                let frame = Frame::message(
                    &subscription_id,
                    &delivery.message_id(),
                    &delivery.destination.to_string(),
                    delivery.event.body(),
                );
                if outbound.send(frame).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(
                    "[Realtime] Subscription {} of connection {} lagged, skipped {} events",
                    subscription_id,
                    connection,
                    skipped
                );
            }
            Err(RecvError::Closed) => break,
        }
    }
}
