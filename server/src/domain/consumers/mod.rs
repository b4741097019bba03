//! Event-driven workflow.
//!
//! One consumer task per subject, all members of a single queue group so a
//! message is processed by exactly one instance. Each consumer processes one
//! message at a time, acks only after its handler's side effects succeed,
//! and periodically claims messages left pending past the ack-wait by a
//! crashed peer.

pub mod handlers;
mod external_sync;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::BusConfig;
use crate::core::constants::BUS_CLAIM_INTERVAL_SECS;
use crate::data::postgres::PostgresService;
use crate::data::topics::TopicService;
use crate::domain::error::CoreError;
use crate::domain::messages::{self, subjects};
use crate::external::ticketing::TicketingClient;
use crate::metrics;

/// How many stuck messages to claim per sweep
const CLAIM_BATCH: usize = 8;

pub struct Workflow {
    handlers: Arc<handlers::WorkflowHandlers>,
    topics: Arc<TopicService>,
    group: String,
    client_id: String,
    ack_wait: Duration,
}

impl Workflow {
    pub fn new(
        store: Arc<PostgresService>,
        ticketing: Arc<TicketingClient>,
        topics: Arc<TopicService>,
        config: &BusConfig,
    ) -> Self {
        Self {
            handlers: Arc::new(handlers::WorkflowHandlers::new(store, ticketing)),
            topics,
            group: config.group.clone(),
            client_id: config.client_id.clone(),
            ack_wait: config.ack_wait,
        }
    }

    /// Spawn one consumer task per subject
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let h = &self.handlers;

        vec![
            self.spawn(subjects::BOOKING_CREATED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::BookingCreated| {
                    let h = Arc::clone(&h);
                    async move { h.booking_created(msg).await }
                }
            }),
            self.spawn(subjects::PAYMENT_INITIATED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::PaymentInitiated| {
                    let h = Arc::clone(&h);
                    async move { h.payment_initiated(msg).await }
                }
            }),
            self.spawn(subjects::PAYMENT_COMPLETED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::PaymentCompleted| {
                    let h = Arc::clone(&h);
                    async move { h.payment_completed(msg).await }
                }
            }),
            self.spawn(subjects::PAYMENT_FAILED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::PaymentFailed| {
                    let h = Arc::clone(&h);
                    async move { h.payment_failed(msg).await }
                }
            }),
            self.spawn(subjects::SEAT_SELECTED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::SeatSelected| {
                    let h = Arc::clone(&h);
                    async move { h.seat_selected(msg).await }
                }
            }),
            self.spawn(subjects::SEAT_RELEASED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::SeatReleased| {
                    let h = Arc::clone(&h);
                    async move { h.seat_released(msg).await }
                }
            }),
            self.spawn(subjects::BOOKING_CANCELLED, shutdown.clone(), {
                let h = Arc::clone(h);
                move |msg: messages::BookingCancelled| {
                    let h = Arc::clone(&h);
                    async move { h.booking_cancelled(msg).await }
                }
            }),
            self.spawn(subjects::BOOKING_EXPIRED, shutdown, {
                let h = Arc::clone(h);
                move |msg: messages::BookingExpired| {
                    let h = Arc::clone(&h);
                    async move { h.booking_expired(msg).await }
                }
            }),
        ]
    }

    fn spawn<T, F, Fut>(
        &self,
        subject: &'static str,
        shutdown: watch::Receiver<bool>,
        handler: F,
    ) -> JoinHandle<()>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let topics = Arc::clone(&self.topics);
        let group = self.group.clone();
        let consumer = format!("{}-{}", self.client_id, subject);
        let ack_wait_ms = self.ack_wait.as_millis() as u64;

        tokio::spawn(async move {
            run_consumer(topics, subject, group, consumer, ack_wait_ms, shutdown, handler).await;
        })
    }
}

async fn run_consumer<T, F, Fut>(
    topics: Arc<TopicService>,
    subject: &'static str,
    group: String,
    consumer: String,
    ack_wait_ms: u64,
    mut shutdown: watch::Receiver<bool>,
    handler: F,
) where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
{
    let topic = topics.stream_topic::<T>(subject);

    // Keep trying to subscribe until the backend comes up or we shut down
    let mut subscriber = loop {
        match topic.subscribe(&group, &consumer).await {
            Ok(sub) => break sub,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "Subscribe failed, retrying");
                tokio::select! {
                    _ = shutdown.changed() => return,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    };

    let acker = subscriber.acker();
    let mut claim_timer = tokio::time::interval(Duration::from_secs(BUS_CLAIM_INTERVAL_SECS));
    claim_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::debug!(subject = %subject, group = %group, consumer = %consumer, "Consumer started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::debug!(subject = %subject, "Consumer stopping");
                    return;
                }
            }

            _ = claim_timer.tick() => {
                // Pick up work a crashed peer left unacked past the ack-wait
                match subscriber.claim(&consumer, ack_wait_ms, CLAIM_BATCH).await {
                    Ok(stuck) => {
                        for (id, msg) in stuck {
                            tracing::info!(subject = %subject, id = %id, "Reprocessing claimed message");
                            handle_one(subject, &handler, &acker, id, msg).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(subject = %subject, error = %e, "Claim sweep failed");
                    }
                }
            }

            received = subscriber.recv() => {
                match received {
                    Ok((id, msg)) => {
                        handle_one(subject, &handler, &acker, id, msg).await;
                    }
                    Err((Some(id), e)) => {
                        // Undecodable payload: ack it away instead of letting
                        // it poison redelivery forever
                        tracing::error!(subject = %subject, id = %id, error = %e, "Dropping bad payload");
                        metrics::WORKFLOW_MESSAGES_TOTAL
                            .with_label_values(&[subject, "bad_payload"])
                            .inc();
                        let _ = acker.ack(&id).await;
                    }
                    Err((None, e)) => {
                        tracing::warn!(subject = %subject, error = %e, "Receive failed, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

async fn handle_one<T, F, Fut>(
    subject: &'static str,
    handler: &F,
    acker: &crate::data::topics::StreamAcker,
    id: String,
    msg: T,
) where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), CoreError>>,
{
    match handler(msg).await {
        Ok(()) => {
            metrics::WORKFLOW_MESSAGES_TOTAL
                .with_label_values(&[subject, "ok"])
                .inc();
            if let Err(e) = acker.ack(&id).await {
                tracing::warn!(subject = %subject, id = %id, error = %e, "Ack failed");
            }
        }
        Err(e) => {
            // No ack: the message stays pending and is redelivered
            metrics::WORKFLOW_MESSAGES_TOTAL
                .with_label_values(&[subject, "error"])
                .inc();
            tracing::error!(subject = %subject, id = %id, error = %e, "Handler failed, message left for redelivery");
        }
    }
}
