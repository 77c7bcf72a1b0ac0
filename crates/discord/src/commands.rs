use async_trait::async_trait;
use thiserror::Error;

use crate::messages::{self, MessageTemplate};

/// Activity recorded when a member reserves without naming a game.
pub const DEFAULT_ACTIVITY: &str = "Unspecified Game";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
    pub is_admin: bool,
    pub request_id: String,
}

/// Who is asking, and with what standing. Admin determination is the
/// platform glue's job (roles, permission bits); the router only gates
/// on the resolved boolean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub user_id: String,
    pub username: String,
    pub channel_id: String,
    pub is_admin: bool,
    pub request_id: String,
}

impl CommandContext {
    pub fn from_slash(payload: &SlashCommandPayload) -> Self {
        Self {
            user_id: payload.user_id.clone(),
            username: payload.username.clone(),
            channel_id: payload.channel_id.clone(),
            is_admin: payload.is_admin,
            request_id: payload.request_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationDetails {
    pub participant_names: String,
    pub activity_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Reserve { details: String },
    Cancel,
    View,
    Reset,
    AdminReserve { table_number: u32, details: String },
    CancelTable { table_number: u32 },
    Help,
    Unknown { verb: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("`{command}` requires a table number")]
    MissingTableNumber { command: String },
    #[error("`{value}` is not a valid table number")]
    InvalidTableNumber { value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetailsParseError {
    #[error("no player names were provided")]
    MissingPlayers,
}

/// Parse the free-text reservation details. The documented format is
/// `"Player1, Player2 + Game Name"`; a `|` separator is accepted for
/// backward compatibility, and a bare player list falls back to
/// [`DEFAULT_ACTIVITY`].
pub fn parse_reservation_details(input: &str) -> Result<ReservationDetails, DetailsParseError> {
    let trimmed = input.trim();
    let (players, activity) = if let Some((players, activity)) = trimmed.split_once('+') {
        (players.trim(), activity.trim())
    } else if let Some((players, activity)) = trimmed.split_once('|') {
        (players.trim(), activity.trim())
    } else {
        (trimmed, "")
    };

    if players.is_empty() {
        return Err(DetailsParseError::MissingPlayers);
    }

    let activity_name =
        if activity.is_empty() { DEFAULT_ACTIVITY.to_string() } else { activity.to_string() };
    Ok(ReservationDetails { participant_names: players.to_string(), activity_name })
}

/// Classify a registered slash command invocation.
pub fn classify_slash_command(
    payload: &SlashCommandPayload,
) -> Result<BotCommand, CommandParseError> {
    classify(&payload.command.to_ascii_lowercase(), payload.text.trim())
}

/// Parse a direct message. Returns `None` when the text does not start
/// with the configured command prefix (the caller decides how to nudge
/// the member toward `help`).
///
/// `adminreserve` is a slash-only surface; in a DM the verb falls
/// through to the unknown-command reply.
pub fn parse_dm_command(
    prefix: &str,
    text: &str,
) -> Option<Result<BotCommand, CommandParseError>> {
    let rest = text.trim().strip_prefix(prefix)?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    if verb.is_empty() {
        return None;
    }
    if verb == "adminreserve" {
        return Some(Ok(BotCommand::Unknown { verb }));
    }
    let args = parts.next().unwrap_or_default().trim();
    Some(classify(&verb, args))
}

fn classify(verb: &str, args: &str) -> Result<BotCommand, CommandParseError> {
    match verb {
        "reserve" => Ok(BotCommand::Reserve { details: args.to_string() }),
        "cancel" => Ok(BotCommand::Cancel),
        "view" => Ok(BotCommand::View),
        "reset" => Ok(BotCommand::Reset),
        "adminreserve" => {
            let (table_number, details) = split_leading_table_number(verb, args)?;
            Ok(BotCommand::AdminReserve { table_number, details })
        }
        "canceltable" => {
            let (table_number, _) = split_leading_table_number(verb, args)?;
            Ok(BotCommand::CancelTable { table_number })
        }
        "help" => Ok(BotCommand::Help),
        other => Ok(BotCommand::Unknown { verb: other.to_string() }),
    }
}

fn split_leading_table_number(
    command: &str,
    args: &str,
) -> Result<(u32, String), CommandParseError> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let raw = parts
        .next()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CommandParseError::MissingTableNumber { command: command.to_string() })?;
    let table_number = raw
        .parse::<u32>()
        .map_err(|_| CommandParseError::InvalidTableNumber { value: raw.to_string() })?;
    Ok((table_number, parts.next().unwrap_or_default().trim().to_string()))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("reservation service failed: {0}")]
    Service(String),
}

/// Bridges classified commands to a [`ReservationCommandService`],
/// answering `help`/unknown verbs locally and gating admin-only
/// commands before the service ever sees them.
pub struct CommandRouter<S> {
    service: S,
    prefix: String,
}

impl<S> CommandRouter<S>
where
    S: ReservationCommandService,
{
    pub fn new(service: S, prefix: impl Into<String>) -> Self {
        Self { service, prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub async fn route(
        &self,
        command: BotCommand,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match command {
            BotCommand::Reserve { details } => match parse_reservation_details(&details) {
                Ok(details) => self.service.reserve(details, ctx).await,
                Err(_) => Ok(messages::reserve_usage_message(&self.prefix)),
            },
            BotCommand::Cancel => self.service.cancel(ctx).await,
            BotCommand::View => self.service.view(ctx).await,
            BotCommand::Reset if !ctx.is_admin => {
                Ok(messages::permission_denied_message("reset reservations"))
            }
            BotCommand::Reset => self.service.reset(ctx).await,
            BotCommand::AdminReserve { .. } if !ctx.is_admin => {
                Ok(messages::permission_denied_message("reserve specific tables"))
            }
            BotCommand::AdminReserve { table_number, details } => {
                match parse_reservation_details(&details) {
                    Ok(details) => self.service.admin_reserve(table_number, details, ctx).await,
                    Err(_) => Ok(messages::admin_reserve_usage_message(&self.prefix)),
                }
            }
            BotCommand::CancelTable { .. } if !ctx.is_admin => {
                Ok(messages::permission_denied_message("cancel other members' reservations"))
            }
            BotCommand::CancelTable { table_number } => {
                self.service.cancel_table(table_number, ctx).await
            }
            BotCommand::Help => Ok(messages::help_message(&self.prefix)),
            BotCommand::Unknown { verb } => {
                Ok(messages::unknown_command_message(&verb, &self.prefix))
            }
        }
    }
}

#[async_trait]
pub trait ReservationCommandService: Send + Sync {
    async fn reserve(
        &self,
        details: ReservationDetails,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn cancel(&self, ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError>;

    async fn view(&self, ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError>;

    async fn reset(&self, ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError>;

    async fn admin_reserve(
        &self,
        table_number: u32,
        details: ReservationDetails,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn cancel_table(
        &self,
        table_number: u32,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

/// Placeholder service used before the registry is wired in; answers
/// every command with a canned acknowledgement.
#[derive(Default)]
pub struct NoopReservationCommandService;

#[async_trait]
impl ReservationCommandService for NoopReservationCommandService {
    async fn reserve(
        &self,
        details: ReservationDetails,
        _ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::reservation_confirmed_message(
            0,
            &details.participant_names,
            &details.activity_name,
        ))
    }

    async fn cancel(&self, _ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::no_reservation_message())
    }

    async fn view(&self, _ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::reservation_list_message(&[], 0))
    }

    async fn reset(&self, _ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::reset_confirmed_message())
    }

    async fn admin_reserve(
        &self,
        table_number: u32,
        details: ReservationDetails,
        _ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::admin_reservation_confirmed_message(
            table_number,
            &details.participant_names,
            &details.activity_name,
        ))
    }

    async fn cancel_table(
        &self,
        table_number: u32,
        _ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(messages::table_not_reserved_message(table_number))
    }
}
