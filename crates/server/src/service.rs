use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};
use warboard_core::registry::{RegistryError, TableRegistry};
use warboard_core::UserId;
use warboard_discord::commands::{
    CommandContext, CommandRouteError, ReservationCommandService, ReservationDetails,
};
use warboard_discord::messages::{self, MessageTemplate};

/// Command service backed by the live [`TableRegistry`]. The registry
/// itself is single-threaded state; this wrapper serializes command
/// handling behind one async mutex so overlapping gateway events see
/// each other's writes.
pub struct RegistryCommandService {
    registry: Arc<Mutex<TableRegistry>>,
}

impl RegistryCommandService {
    pub fn new(registry: Arc<Mutex<TableRegistry>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ReservationCommandService for RegistryCommandService {
    async fn reserve(
        &self,
        details: ReservationDetails,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let mut registry = self.registry.lock().await;
        match registry.allocate(
            UserId(ctx.user_id.clone()),
            ctx.username.clone(),
            details.participant_names.clone(),
            details.activity_name.clone(),
        ) {
            Ok(table_number) => {
                info!(
                    event_name = "reservation.reserve.confirmed",
                    correlation_id = %ctx.request_id,
                    user_id = %ctx.user_id,
                    table_number,
                    "table reserved"
                );
                Ok(messages::reservation_confirmed_message(
                    table_number,
                    &details.participant_names,
                    &details.activity_name,
                ))
            }
            Err(RegistryError::AlreadyReserved { table_number }) => {
                Ok(messages::already_reserved_message(table_number))
            }
            Err(RegistryError::CapacityExceeded { .. }) => {
                info!(
                    event_name = "reservation.reserve.capacity_full",
                    correlation_id = %ctx.request_id,
                    user_id = %ctx.user_id,
                    "reservation refused; all tables occupied"
                );
                Ok(messages::capacity_full_message())
            }
            Err(other) => Err(CommandRouteError::Service(other.to_string())),
        }
    }

    async fn cancel(&self, ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError> {
        let mut registry = self.registry.lock().await;
        let requester = UserId(ctx.user_id.clone());
        let Some(table_number) =
            registry.find_by_requester(&requester).map(|reservation| reservation.table_number)
        else {
            return Ok(messages::no_reservation_message());
        };

        registry.release(&requester);
        info!(
            event_name = "reservation.cancel.confirmed",
            correlation_id = %ctx.request_id,
            user_id = %ctx.user_id,
            table_number,
            "reservation cancelled"
        );
        Ok(messages::cancel_confirmed_message(table_number))
    }

    async fn view(&self, _ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError> {
        let registry = self.registry.lock().await;
        Ok(messages::reservation_list_message(&registry.list_all(), registry.capacity()))
    }

    async fn reset(&self, ctx: &CommandContext) -> Result<MessageTemplate, CommandRouteError> {
        let mut registry = self.registry.lock().await;
        let released = registry.capacity() - registry.available_count();
        registry.reset_all();
        warn!(
            event_name = "reservation.reset.confirmed",
            correlation_id = %ctx.request_id,
            user_id = %ctx.user_id,
            released,
            "all reservations cleared by an admin"
        );
        Ok(messages::reset_confirmed_message())
    }

    async fn admin_reserve(
        &self,
        table_number: u32,
        details: ReservationDetails,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let mut registry = self.registry.lock().await;

        // Occupant details feed the refusal message, so look before
        // attempting the allocation.
        if let Some(occupant) = registry.find_by_table(table_number) {
            return Ok(messages::table_unavailable_message(
                table_number,
                &occupant.participant_names,
                &occupant.activity_name,
            ));
        }

        match registry.allocate_specific(
            UserId(ctx.user_id.clone()),
            ctx.username.clone(),
            details.participant_names.clone(),
            details.activity_name.clone(),
            table_number,
        ) {
            Ok(table_number) => {
                info!(
                    event_name = "reservation.admin_reserve.confirmed",
                    correlation_id = %ctx.request_id,
                    user_id = %ctx.user_id,
                    table_number,
                    "table reserved by an admin"
                );
                Ok(messages::admin_reservation_confirmed_message(
                    table_number,
                    &details.participant_names,
                    &details.activity_name,
                ))
            }
            Err(RegistryError::InvalidTableNumber { table_number, capacity }) => {
                Ok(messages::invalid_table_number_message(table_number, capacity))
            }
            Err(other) => Err(CommandRouteError::Service(other.to_string())),
        }
    }

    async fn cancel_table(
        &self,
        table_number: u32,
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let mut registry = self.registry.lock().await;
        match registry.release_table(table_number) {
            Some(removed) => {
                info!(
                    event_name = "reservation.cancel_table.confirmed",
                    correlation_id = %ctx.request_id,
                    user_id = %ctx.user_id,
                    table_number,
                    "reservation cancelled by an admin"
                );
                Ok(messages::table_cancelled_message(table_number, &removed.participant_names))
            }
            None => Ok(messages::table_not_reserved_message(table_number)),
        }
    }
}
