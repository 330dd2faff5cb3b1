//! Broadcast channel mirroring manager events to async consumers.

use tokio::sync::broadcast;
use wallet_types::ManagerEvent;

/// Event bus for broadcasting wallet manager events to multiple subscribers.
///
/// The synchronous listeners registered through `WalletManager::on` run on
/// the emitting call stack. The bus delivers the same events through a
/// tokio broadcast channel for consumers that prefer to await them.
pub struct EventBus {
	sender: broadcast::Sender<ManagerEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// A subscriber that falls more than `capacity` events behind observes
	/// `RecvError::Lagged` and skips ahead.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Each subscriber receives every event published after it subscribed.
	pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if there are no active subscribers.
	pub fn publish(
		&self,
		event: ManagerEvent,
	) -> Result<(), broadcast::error::SendError<ManagerEvent>> {
		self.sender.send(event)?;
		Ok(())
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
