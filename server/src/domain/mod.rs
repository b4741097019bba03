//! Domain layer: booking/seat/payment services, the event-driven workflow
//! and the expiration job.

pub mod bookings;
pub mod consumers;
pub mod error;
pub mod events;
pub mod expiration;
pub mod messages;
pub mod reset;
pub mod seats;

pub use error::CoreError;

use std::sync::Arc;

use crate::data::cache::CacheService;
use crate::data::postgres::PostgresService;
use crate::data::search::SearchService;
use crate::data::topics::TopicService;
use crate::external::payment::PaymentClient;
use crate::external::ticketing::TicketingClient;

/// Domain services bundle, built once by the composition root
pub struct Services {
    pub events: events::EventService,
    pub bookings: bookings::BookingService,
    pub seats: seats::SeatService,
    pub reset: reset::ResetService,
}

impl Services {
    pub fn new(
        store: Arc<PostgresService>,
        search: Arc<SearchService>,
        cache: Arc<CacheService>,
        topics: Arc<TopicService>,
        payment: Arc<PaymentClient>,
        ticketing: Arc<TicketingClient>,
    ) -> Self {
        Self {
            events: events::EventService::new(Arc::clone(&store), Arc::clone(&search)),
            bookings: bookings::BookingService::new(
                Arc::clone(&store),
                search,
                payment,
                ticketing,
                Arc::clone(&topics),
            ),
            seats: seats::SeatService::new(Arc::clone(&store), topics),
            reset: reset::ResetService::new(store, cache),
        }
    }
}
