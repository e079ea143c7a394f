//! Shared cart and session state.
//!
//! The session only changes while the cart's write lock is held, so a reader holding the cart
//! lock sees a session and a cart that belong together. Lock order is always cart, then session.

use std::sync::atomic::{AtomicBool, Ordering};

use bookshelf::{CartAction, CartState};
use tokio::sync::watch;

use crate::{cart::errors::CartError, identity::UserUuid, notifications::Notifier};

/// The session the cart currently belongs to.
///
/// `epoch` increases on every change of user, so intents queued for an earlier session can be
/// recognised and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub(crate) user: Option<UserUuid>,
    pub(crate) epoch: u64,
}

/// State shared between the service handle and the sync worker.
#[derive(Debug)]
pub(crate) struct CartStore {
    cart: watch::Sender<CartState>,
    session: watch::Sender<SessionState>,
    save_pending: AtomicBool,
    pub(crate) notifier: Notifier,
}

impl CartStore {
    pub(crate) fn new(notifier: Notifier) -> Self {
        Self {
            cart: watch::Sender::new(CartState::new()),
            session: watch::Sender::new(SessionState::default()),
            save_pending: AtomicBool::new(false),
            notifier,
        }
    }

    /// Apply an action, waking subscribers only when the cart actually changed.
    pub(crate) fn dispatch(&self, action: CartAction) -> bool {
        self.cart.send_if_modified(|cart| cart.apply(action))
    }

    /// Apply an action only if the cart it produces passes `check`.
    pub(crate) fn try_dispatch(
        &self,
        action: CartAction,
        check: impl FnOnce(&CartState) -> Result<(), CartError>,
    ) -> Result<bool, CartError> {
        let mut outcome = Ok(false);

        self.cart.send_if_modified(|cart| {
            let mut next = cart.clone();

            if !next.apply(action) {
                return false;
            }

            if let Err(error) = check(&next) {
                outcome = Err(error);
                return false;
            }

            *cart = next;
            outcome = Ok(true);

            true
        });

        outcome
    }

    /// Apply an action for the session at `epoch`. Returns `None` if that session has ended.
    pub(crate) fn dispatch_for(&self, epoch: u64, action: CartAction) -> Option<bool> {
        let mut applied = None;

        self.cart.send_if_modified(|cart| {
            if self.session.borrow().epoch != epoch {
                return false;
            }

            let changed = cart.apply(action);
            applied = Some(changed);

            changed
        });

        applied
    }

    pub(crate) fn snapshot(&self) -> CartState {
        self.cart.borrow().clone()
    }

    /// The session at `epoch` together with its cart, read under one lock.
    ///
    /// Returns `None` if that session has ended.
    pub(crate) fn snapshot_for(&self, epoch: u64) -> Option<(SessionState, CartState)> {
        let cart = self.cart.borrow();
        let session = *self.session.borrow();

        (session.epoch == epoch).then(|| (session, (*cart).clone()))
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<CartState> {
        self.cart.subscribe()
    }

    pub(crate) fn session(&self) -> SessionState {
        *self.session.borrow()
    }

    /// Switch to `user`, returning the previous session and the new one.
    ///
    /// The cart is emptied in the same step when the session ends or passes from one user to
    /// another; a signed-out cart carries over into a sign-in. Returns `None` when `user`
    /// already owns the cart.
    pub(crate) fn switch_session(
        &self,
        user: Option<UserUuid>,
    ) -> Option<(SessionState, SessionState)> {
        let mut switched = None;

        self.cart.send_if_modified(|cart| {
            self.session.send_if_modified(|session| {
                if session.user == user {
                    return false;
                }

                let previous = *session;

                session.user = user;
                session.epoch += 1;

                switched = Some((previous, *session));

                true
            });

            let Some((previous, current)) = switched else {
                return false;
            };

            self.save_pending.store(false, Ordering::SeqCst);

            if current.user.is_none() || previous.user.is_some() {
                cart.apply(CartAction::ClearCart)
            } else {
                false
            }
        });

        switched
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.session.borrow().epoch == epoch
    }

    /// Marks a save as queued. Returns `false` when one already is.
    pub(crate) fn claim_save(&self) -> bool {
        !self.save_pending.swap(true, Ordering::SeqCst)
    }

    /// Called by the worker before it reads the snapshot it will save.
    pub(crate) fn release_save(&self) {
        self.save_pending.store(false, Ordering::SeqCst);
    }
}
