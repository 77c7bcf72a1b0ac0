use serde::Serialize;
use warboard_core::Reservation;

/// Accent color used on every reservation embed.
pub const EMBED_COLOR: u32 = 0x0099ff;

/// Reservations rendered per embed page in the `view` reply.
pub const LIST_PAGE_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub color: u32,
}

/// Platform-neutral reply: plain content plus optional rich embeds.
/// `ephemeral` replies are shown only to the invoking member.
/// `direct_message` is a follow-up notice the transport delivers to
/// the invoker's DM channel, separate from the reply itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    pub ephemeral: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_message: Option<Box<MessageTemplate>>,
}

pub struct MessageBuilder {
    content: String,
    embeds: Vec<Embed>,
    ephemeral: bool,
    direct_message: Option<Box<MessageTemplate>>,
}

impl MessageBuilder {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), embeds: Vec::new(), ephemeral: false, direct_message: None }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn direct_message(mut self, template: MessageTemplate) -> Self {
        self.direct_message = Some(Box::new(template));
        self
    }

    pub fn embed<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.embeds.push(builder.build());
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            content: self.content,
            embeds: self.embeds,
            ephemeral: self.ephemeral,
            direct_message: self.direct_message,
        }
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    title: String,
    description: String,
    fields: Vec<EmbedField>,
    footer: Option<String>,
}

impl EmbedBuilder {
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = title.into();
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into() });
        self
    }

    pub fn footer(&mut self, footer: impl Into<String>) -> &mut Self {
        self.footer = Some(footer.into());
        self
    }

    fn build(self) -> Embed {
        Embed {
            title: self.title,
            description: self.description,
            fields: self.fields,
            footer: self.footer,
            color: EMBED_COLOR,
        }
    }
}

/// Member-reserve confirmation. Carries the payment reminder as a DM
/// follow-up; the admin path confirms without one.
pub fn reservation_confirmed_message(
    table_number: u32,
    participant_names: &str,
    activity_name: &str,
) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Table {table_number} has been reserved for {participant_names} playing \
         {activity_name}. Have a great game!"
    ))
    .direct_message(payment_reminder_message(table_number, participant_names, activity_name))
    .build()
}

pub fn payment_reminder_message(
    table_number: u32,
    participant_names: &str,
    activity_name: &str,
) -> MessageTemplate {
    MessageBuilder::new(format!(
        "**Payment Reminder for Table {table_number}**\n\n\
         Thank you for reserving Table {table_number} for {participant_names} playing \
         {activity_name}.\n\n\
         Please remember to pay for your table before playing. This helps us maintain the club \
         and provide the best gaming experience for everyone.\n\n\
         You can pay at the club entrance when you arrive. If you have any questions, please \
         speak to a club admin.\n\nHave a great game!"
    ))
    .build()
}

pub fn admin_reservation_confirmed_message(
    table_number: u32,
    participant_names: &str,
    activity_name: &str,
) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Table {table_number} has been reserved for {participant_names} playing \
         {activity_name}. Reservation created by admin."
    ))
    .build()
}

pub fn already_reserved_message(table_number: u32) -> MessageTemplate {
    MessageBuilder::new(format!(
        "You already have a reservation at Table {table_number}. Please cancel it first if you \
         want to make a new reservation."
    ))
    .ephemeral()
    .build()
}

pub fn capacity_full_message() -> MessageTemplate {
    MessageBuilder::new("Sorry, all tables are currently reserved. Please try again later.")
        .ephemeral()
        .build()
}

pub fn table_unavailable_message(
    table_number: u32,
    participant_names: &str,
    activity_name: &str,
) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Table {table_number} is already reserved by {participant_names} for {activity_name}."
    ))
    .ephemeral()
    .build()
}

pub fn invalid_table_number_message(table_number: u32, capacity: u32) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Table {table_number} does not exist. Valid table numbers are 1 to {capacity}."
    ))
    .ephemeral()
    .build()
}

pub fn cancel_confirmed_message(table_number: u32) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Your reservation for Table {table_number} has been canceled. Thank you!"
    ))
    .build()
}

pub fn no_reservation_message() -> MessageTemplate {
    MessageBuilder::new("You don't have any active reservations to cancel.").ephemeral().build()
}

pub fn table_cancelled_message(table_number: u32, participant_names: &str) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Reservation for Table {table_number} ({participant_names}) has been canceled."
    ))
    .build()
}

pub fn table_not_reserved_message(table_number: u32) -> MessageTemplate {
    MessageBuilder::new(format!("There is no reservation for Table {table_number}."))
        .ephemeral()
        .build()
}

pub fn reset_confirmed_message() -> MessageTemplate {
    MessageBuilder::new(
        "All table reservations have been reset. The tables are now available for the next \
         session.",
    )
    .build()
}

pub fn permission_denied_message(action: &str) -> MessageTemplate {
    MessageBuilder::new(format!(
        "You do not have permission to use this command. Only club admins can {action}."
    ))
    .ephemeral()
    .build()
}

pub fn channel_not_allowed_message() -> MessageTemplate {
    MessageBuilder::new("This command can only be used in designated channels or via DM.")
        .ephemeral()
        .build()
}

pub fn reserve_usage_message(prefix: &str) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Please provide player names and game name (format: \"Player1, Player2 + Game Name\", \
         e.g. `{prefix}reserve John, Bob + Warhammer 40k`)."
    ))
    .ephemeral()
    .build()
}

pub fn admin_reserve_usage_message(prefix: &str) -> MessageTemplate {
    MessageBuilder::new(format!(
        "Usage: `{prefix}adminreserve <table_number> <player1, player2, ...> + <game_name>`."
    ))
    .ephemeral()
    .build()
}

pub fn unknown_command_message(verb: &str, prefix: &str) -> MessageTemplate {
    MessageBuilder::new(format!(
        "I don't recognize `{verb}`. Type `{prefix}help` for a list of available commands."
    ))
    .ephemeral()
    .build()
}

pub fn unknown_dm_message(prefix: &str) -> MessageTemplate {
    MessageBuilder::new(format!(
        "I don't recognize that command. Type `{prefix}help` for a list of available commands."
    ))
    .build()
}

pub fn error_message(summary: &str, request_id: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{summary} (request {request_id})")).ephemeral().build()
}

pub fn help_message(prefix: &str) -> MessageTemplate {
    MessageBuilder::new("Wargaming Table Reservation Bot Commands")
        .embed(|embed| {
            embed
                .title("Wargaming Table Reservation Bot Commands")
                .description(
                    "Slash commands:\n\
                     • `/reserve <details>` - Reserve a table (format: \"Player1, Player2 + Game Name\")\n\
                     • `/cancel` - Cancel your reservation\n\
                     • `/view` - View all current reservations\n\
                     • `/reset` - Reset all reservations (Admin only)\n\
                     • `/adminreserve` - Reserve a specific table for players (Admin only)\n\
                     • `/canceltable <table>` - Cancel a reservation by table number (Admin only)",
                )
                .field(
                    "Direct messages",
                    format!(
                        "• `{prefix}reserve <player names> + <game name>`\n\
                         • `{prefix}cancel`\n\
                         • `{prefix}view`\n\
                         • `{prefix}reset` (Admin only)\n\
                         • `{prefix}canceltable <table number>` (Admin only)\n\
                         • `{prefix}help`"
                    ),
                );
        })
        .build()
}

/// The `view` reply: every active reservation, ten per embed page, with
/// the occupancy summary repeated on each page.
pub fn reservation_list_message(reservations: &[Reservation], capacity: u32) -> MessageTemplate {
    if reservations.is_empty() {
        return MessageBuilder::new("There are no current table reservations.").build();
    }

    let reserved = reservations.len();
    let free = capacity.saturating_sub(reserved as u32);
    let total_pages = reserved.div_ceil(LIST_PAGE_SIZE);

    let mut builder =
        MessageBuilder::new(format!("{reserved}/{capacity} tables reserved ({free} available)"));

    for (page, chunk) in reservations.chunks(LIST_PAGE_SIZE).enumerate() {
        builder = builder.embed(|embed| {
            embed.title("Wargaming Club Table Reservations").description(format!(
                "**Current Status:** {reserved}/{capacity} tables reserved ({free} available)"
            ));

            for reservation in chunk {
                embed.field(
                    format!("Table {}", reservation.table_number),
                    format!(
                        "**Players:** {}\n**Game:** {}\n**Reserved by:** {}",
                        reservation.participant_names,
                        reservation.activity_name,
                        reservation.username
                    ),
                );
            }

            if page == 0 {
                embed.footer(format!("Page {}/{total_pages} • Use !help for commands", page + 1));
            } else {
                embed.footer(format!("Page {}/{total_pages}", page + 1));
            }
        });
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use warboard_core::{Reservation, UserId};

    use super::{
        admin_reservation_confirmed_message, help_message, permission_denied_message,
        reservation_confirmed_message, reservation_list_message, MessageBuilder, LIST_PAGE_SIZE,
    };

    fn reservation(table_number: u32) -> Reservation {
        Reservation {
            requester_id: UserId(format!("u{table_number}")),
            username: format!("user{table_number}#0001"),
            participant_names: "Ann, Ben".to_string(),
            activity_name: "Bolt Action".to_string(),
            table_number,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn builder_collects_embeds_and_fields() {
        let message = MessageBuilder::new("fallback")
            .embed(|embed| {
                embed.title("Reservations").description("status").field("Table 1", "Players");
            })
            .build();

        assert_eq!(message.content, "fallback");
        assert_eq!(message.embeds.len(), 1);
        assert_eq!(message.embeds[0].fields.len(), 1);
        assert!(!message.ephemeral);
    }

    #[test]
    fn confirmation_names_table_players_and_game() {
        let message = reservation_confirmed_message(3, "Ann, Ben", "Bolt Action");
        assert!(message.content.contains("Table 3"));
        assert!(message.content.contains("Ann, Ben"));
        assert!(message.content.contains("Bolt Action"));
    }

    #[test]
    fn confirmation_carries_the_payment_reminder_follow_up() {
        let message = reservation_confirmed_message(3, "Ann, Ben", "Bolt Action");
        let reminder = message.direct_message.as_deref().expect("payment reminder follow-up");
        assert!(reminder.content.contains("Payment Reminder for Table 3"));
        assert!(reminder.content.contains("pay for your table before playing"));
        assert!(reminder.direct_message.is_none());

        let admin = admin_reservation_confirmed_message(3, "Ann, Ben", "Bolt Action");
        assert!(admin.direct_message.is_none());
    }

    #[test]
    fn permission_notice_is_ephemeral() {
        let message = permission_denied_message("reset reservations");
        assert!(message.ephemeral);
        assert!(message.content.contains("reset reservations"));
    }

    #[test]
    fn empty_list_reports_no_reservations() {
        let message = reservation_list_message(&[], 15);
        assert!(message.embeds.is_empty());
        assert!(message.content.contains("no current table reservations"));
    }

    #[test]
    fn list_paginates_ten_reservations_per_embed() {
        let rows: Vec<_> = (1..=12).map(reservation).collect();
        let message = reservation_list_message(&rows, 15);

        assert_eq!(message.embeds.len(), 2);
        assert_eq!(message.embeds[0].fields.len(), LIST_PAGE_SIZE);
        assert_eq!(message.embeds[1].fields.len(), 2);
        assert!(message.embeds[0].description.contains("12/15 tables reserved (3 available)"));
        assert_eq!(
            message.embeds[0].footer.as_deref(),
            Some("Page 1/2 • Use !help for commands")
        );
        assert_eq!(message.embeds[1].footer.as_deref(), Some("Page 2/2"));
    }

    #[test]
    fn help_lists_both_command_surfaces() {
        let message = help_message("!");
        assert_eq!(message.embeds.len(), 1);
        assert!(message.embeds[0].description.contains("/reserve"));
        assert!(message.embeds[0].fields[0].value.contains("!reserve"));
    }
}
