use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    commands::{
        classify_slash_command, parse_dm_command, CommandContext, CommandRouteError,
        CommandRouter, ReservationCommandService, SlashCommandPayload,
    },
    messages::{self, MessageTemplate},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEnvelope {
    pub envelope_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    SlashCommand(SlashCommandPayload),
    DirectMessage(DirectMessageEvent),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::SlashCommand(_) => GatewayEventType::SlashCommand,
            Self::DirectMessage(_) => GatewayEventType::DirectMessage,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    SlashCommand,
    DirectMessage,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectMessageEvent {
    pub user_id: String,
    pub username: String,
    pub is_admin: bool,
    pub text: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };
        Ok(handler.handle(envelope, ctx).await?)
    }
}

/// Guild-channel allow-list from the bot configuration. An empty list
/// allows every channel. Only `DirectMessage` events skip the filter;
/// slash commands are always checked against the `channel_id` they
/// arrived with.
#[derive(Clone, Debug, Default)]
pub struct ChannelFilter {
    allowed_channel_ids: Vec<String>,
}

impl ChannelFilter {
    pub fn new(allowed_channel_ids: Vec<String>) -> Self {
        Self { allowed_channel_ids }
    }

    pub fn allows(&self, channel_id: &str) -> bool {
        self.allowed_channel_ids.is_empty()
            || self.allowed_channel_ids.iter().any(|allowed| allowed == channel_id)
    }
}

/// Handles slash-command envelopes: channel gating, classification,
/// routing. Parse problems (bad table numbers) are answered to the
/// member rather than surfaced as handler failures.
pub struct SlashCommandHandler<S> {
    router: Arc<CommandRouter<S>>,
    filter: ChannelFilter,
}

impl<S> SlashCommandHandler<S> {
    pub fn new(router: Arc<CommandRouter<S>>, filter: ChannelFilter) -> Self {
        Self { router, filter }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: ReservationCommandService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &EventEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if !self.filter.allows(&payload.channel_id) {
            return Ok(HandlerResult::Responded(messages::channel_not_allowed_message()));
        }

        let command = match classify_slash_command(payload) {
            Ok(command) => command,
            Err(parse_error) => {
                return Ok(HandlerResult::Responded(messages::error_message(
                    &parse_error.to_string(),
                    &payload.request_id,
                )));
            }
        };

        let ctx = CommandContext::from_slash(payload);
        let reply = self.router.route(command, &ctx).await?;
        Ok(HandlerResult::Responded(reply))
    }
}

/// Handles direct-message envelopes. Any DM that does not start with
/// the command prefix gets the help nudge, matching the bot's behavior
/// in guild-free conversations.
pub struct DirectMessageHandler<S> {
    router: Arc<CommandRouter<S>>,
}

impl<S> DirectMessageHandler<S> {
    pub fn new(router: Arc<CommandRouter<S>>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<S> EventHandler for DirectMessageHandler<S>
where
    S: ReservationCommandService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::DirectMessage
    }

    async fn handle(
        &self,
        envelope: &EventEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::DirectMessage(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = match parse_dm_command(self.router.prefix(), &event.text) {
            Some(Ok(command)) => command,
            Some(Err(parse_error)) => {
                return Ok(HandlerResult::Responded(messages::error_message(
                    &parse_error.to_string(),
                    &event.request_id,
                )));
            }
            None => {
                return Ok(HandlerResult::Responded(messages::unknown_dm_message(
                    self.router.prefix(),
                )));
            }
        };

        let ctx = CommandContext {
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            channel_id: String::new(),
            is_admin: event.is_admin,
            request_id: event.request_id.clone(),
        };
        let reply = self.router.route(command, &ctx).await?;
        Ok(HandlerResult::Responded(reply))
    }
}

/// Dispatcher wired with the slash and DM handlers over one shared
/// router.
pub fn command_dispatcher<S>(router: CommandRouter<S>, filter: ChannelFilter) -> EventDispatcher
where
    S: ReservationCommandService + 'static,
{
    let router = Arc::new(router);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(Arc::clone(&router), filter));
    dispatcher.register(DirectMessageHandler::new(router));
    dispatcher
}
