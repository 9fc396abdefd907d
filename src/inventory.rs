//! Inventory service
//!
//! Business operations on stock positions:
//! - Income and outcome registration
//! - Filtered stock totals
//! - Position updates
//! - CSV batch import

use std::io::Read;
use crossbeam::channel::Sender;
use tokio_util::sync::CancellationToken;
use crate::{Error, Result};
use crate::importer::{ImportOptions, ImportReport, Importer, SockSink, sock_schema};
use crate::sock::{Sock, SockRequest, StockFilter};
use crate::storage::{SqliteStore, is_unique_violation};
use crate::ui::ProgressMessage;

fn pair_taken(owner: i64) -> Error {
    Error::InvalidArgument(format!(
        "Socks with this color and cotton percentage already exist under id {}, change their quantity instead",
        owner
    ))
}

/// Inventory operations over one store connection
pub struct Inventory<'a> {
    store: &'a SqliteStore,
}

impl<'a> Inventory<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Add incoming pairs to a position, creating it when needed
    pub fn register_income(&self, request: &SockRequest) -> Result<Sock> {
        let movement = request.validate()?;
        let sock = self
            .store
            .add_quantity(&movement.color, movement.cotton_percentage, movement.quantity)?;
        tracing::info!(
            "Registered income: {} socks of color {} with {}% cotton",
            movement.quantity, movement.color, movement.cotton_percentage
        );
        Ok(sock)
    }

    /// Remove outgoing pairs from an existing position
    pub fn register_outcome(&self, request: &SockRequest) -> Result<Sock> {
        let movement = request.validate()?;
        let sock = self
            .store
            .remove_quantity(&movement.color, movement.cotton_percentage, movement.quantity)?;
        tracing::info!(
            "Registered outcome: {} socks of color {} with {}% cotton",
            movement.quantity, movement.color, movement.cotton_percentage
        );
        Ok(sock)
    }

    /// Total pairs of one color within an inclusive cotton range
    pub fn quantity_with_filter(&self, filter: &StockFilter) -> Result<i64> {
        filter.validate()?;
        let total = self.store.total_quantity(
            &filter.color,
            filter.min_cotton_percentage,
            filter.max_cotton_percentage,
        )?;
        tracing::info!(
            "Quantity of {} socks with cotton in [{}, {}]: {}",
            filter.color, filter.min_cotton_percentage, filter.max_cotton_percentage, total
        );
        Ok(total)
    }

    /// Overwrite a position. Moving it onto a pair owned by another id is refused.
    pub fn update_sock(&self, id: i64, request: &SockRequest) -> Result<Sock> {
        let movement = request.validate()?;

        if let Some(existing) = self
            .store
            .find_by_color_and_cotton(&movement.color, movement.cotton_percentage)?
        {
            if existing.id != id {
                return Err(pair_taken(existing.id));
            }
        }

        let mut sock = self.get_sock(id)?;
        sock.color = movement.color;
        sock.cotton_percentage = movement.cotton_percentage;
        sock.quantity = movement.quantity;
        self.write_update(&sock)?;

        tracing::info!(
            "Updated sock with id {}: color={}, cottonPercentage={}, quantity={}",
            id, sock.color, sock.cotton_percentage, sock.quantity
        );
        Ok(sock)
    }

    /// Store the update; a pair claimed by another writer meanwhile is the
    /// same client error as one found up front.
    fn write_update(&self, sock: &Sock) -> Result<()> {
        match self.store.update_sock(sock) {
            Err(Error::Storage(e)) if is_unique_violation(&e) => {
                let owner = self
                    .store
                    .find_by_color_and_cotton(&sock.color, sock.cotton_percentage)?;
                Err(match owner {
                    Some(owner) => pair_taken(owner.id),
                    None => Error::InvalidArgument(
                        "Socks with this color and cotton percentage already exist".to_string(),
                    ),
                })
            }
            other => other,
        }
    }

    pub fn get_sock(&self, id: i64) -> Result<Sock> {
        self.store
            .find_sock(id)?
            .ok_or_else(|| Error::NotFound(format!("Sock not found with id: {}", id)))
    }

    pub fn list_socks(&self) -> Result<Vec<Sock>> {
        self.store.list_socks()
    }

    /// Stream a CSV stock file into the store, one commit per row
    pub fn import_csv<R: Read>(
        &self,
        input: R,
        options: &ImportOptions,
        cancel: &CancellationToken,
        progress: Option<Sender<ProgressMessage>>,
    ) -> Result<ImportReport> {
        let mut importer = Importer::new(sock_schema(), options.clone()).with_cancel(cancel.clone());
        if let Some(tx) = progress {
            importer = importer.with_progress(tx);
        }
        let report = importer.run(input, &mut SockSink::new(self.store))?;
        Ok(report)
    }
}
