//! Listener lists with scoped registration.
//!
//! Every registration returns a [`Subscription`] that unregisters its
//! listener when dropped, so an owner releases everything it subscribed to
//! by dropping its [`Subscriptions`].

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
	next_id: u64,
	entries: Vec<(u64, Listener<T>)>,
}

/// Fans one event type out to every registered listener.
pub struct Emitter<T> {
	listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: 'static> Emitter<T> {
	pub fn new() -> Self {
		Self {
			listeners: Arc::new(Mutex::new(Listeners {
				next_id: 0,
				entries: Vec::new(),
			})),
		}
	}

	pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
		let id = {
			let mut listeners = self.listeners.lock();
			let id = listeners.next_id;
			listeners.next_id += 1;
			listeners.entries.push((id, Arc::new(listener)));
			id
		};
		let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
		Subscription::new(move || {
			if let Some(listeners) = weak.upgrade() {
				listeners.lock().entries.retain(|(entry, _)| *entry != id);
			}
		})
	}

	/// Calls every listener registered at the time of the call.
	///
	/// Listeners run outside the lock and may subscribe or unsubscribe.
	pub fn fire(&self, event: &T) {
		let snapshot: Vec<Listener<T>> = self
			.listeners
			.lock()
			.entries
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect();
		for listener in snapshot {
			listener(event);
		}
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().entries.len()
	}
}

impl<T: 'static> Default for Emitter<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> std::fmt::Debug for Emitter<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Emitter")
			.field("listeners", &self.listeners.lock().entries.len())
			.finish()
	}
}

/// Registration handle; releases on drop.
#[must_use = "dropping a subscription unregisters it immediately"]
pub struct Subscription {
	release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
	pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
		Self {
			release: Some(Box::new(release)),
		}
	}

	pub fn dispose(mut self) {
		self.release_now();
	}

	fn release_now(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release_now();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.release.is_some())
			.finish()
	}
}

/// Subscriptions released together.
#[derive(Debug, Default)]
pub struct Subscriptions {
	items: Vec<Subscription>,
}

impl Subscriptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, subscription: Subscription) {
		self.items.push(subscription);
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Releases every subscription, in registration order.
	pub fn dispose(&mut self) {
		for mut subscription in self.items.drain(..) {
			subscription.release_now();
		}
	}
}

impl Drop for Subscriptions {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl Extend<Subscription> for Subscriptions {
	fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
		self.items.extend(iter);
	}
}
