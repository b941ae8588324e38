//! Lifecycle rules for medicine orders.
//!
//! An order carries three independent fields: its lifecycle `status`, its
//! `payment_status` and the `verification_status` of the prescription. The
//! functions here decide which changes the current combination allows; the
//! database layer calls them inside the transaction that applies the change.

use crate::db::models::{Order, OrderStatus, PaymentStatus, VerificationStatus};
use crate::errors::TransitionError;

const ENTITY: &str = "order";

/// The invariant-bearing part of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub verification_status: VerificationStatus,
    pub delivery_agent_id: Option<i32>,
}

impl From<&Order> for OrderState {
    fn from(order: &Order) -> Self {
        Self {
            status: order.status,
            payment_status: order.payment_status,
            verification_status: order.verification_status,
            delivery_agent_id: order.delivery_agent_id,
        }
    }
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    fn ensure_open(&self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal {
                entity: ENTITY,
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    fn not_allowed(&self, to: OrderStatus) -> TransitionError {
        TransitionError::NotAllowed {
            entity: ENTITY,
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// Lifecycle states reachable from the current state, given the payment
    /// and assignment it has right now
    pub fn allowed_next(&self) -> Vec<OrderStatus> {
        [
            OrderStatus::Verified,
            OrderStatus::Dispatched,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ]
        .into_iter()
        .filter(|next| match next {
            OrderStatus::Verified => {
                self.status == OrderStatus::Pending
                    && self.verification_status != VerificationStatus::NotVerified
            }
            OrderStatus::Cancelled => self.check_cancellable().is_ok(),
            other => self.check_delivery_transition(*other).is_ok(),
        })
        .collect()
    }

    /// Records the review outcome and returns the lifecycle status it implies.
    /// A positive review releases a pending order for delivery; a negative or
    /// reset review holds it at pending.
    pub fn apply_verification(
        &self,
        next: VerificationStatus,
    ) -> Result<OrderStatus, TransitionError> {
        self.ensure_open()?;
        match (self.status, next) {
            (OrderStatus::Pending, VerificationStatus::Verified) => Ok(OrderStatus::Verified),
            (OrderStatus::Pending, _) => Ok(OrderStatus::Pending),
            (OrderStatus::Verified, VerificationStatus::Verified) => Ok(OrderStatus::Verified),
            // Withdrawing the approval is only possible before an agent takes it
            (OrderStatus::Verified, _) if self.delivery_agent_id.is_none() => {
                Ok(OrderStatus::Pending)
            }
            (OrderStatus::Verified, _) => Err(TransitionError::Rejected(
                "Verification cannot be withdrawn once a delivery agent is assigned".to_string(),
            )),
            (status, _) => Err(TransitionError::Rejected(format!(
                "Verification cannot change once the order is {status}"
            ))),
        }
    }

    /// Checks a status change requested from the delivery portal
    pub fn check_delivery_transition(&self, next: OrderStatus) -> Result<(), TransitionError> {
        self.ensure_open()?;
        match (self.status, next) {
            (OrderStatus::Verified, OrderStatus::Dispatched) => {
                if self.delivery_agent_id.is_none() {
                    return Err(TransitionError::Rejected(
                        "Order has no delivery agent assigned".to_string(),
                    ));
                }
                Ok(())
            }
            (OrderStatus::Dispatched, OrderStatus::Delivered) => {
                if self.payment_status != PaymentStatus::Paid {
                    return Err(TransitionError::PaymentRequired);
                }
                Ok(())
            }
            (_, OrderStatus::Delivered) if self.payment_status != PaymentStatus::Paid => {
                Err(TransitionError::PaymentRequired)
            }
            (_, to) => Err(self.not_allowed(to)),
        }
    }

    /// Payment can be toggled while the order is still open
    pub fn check_payment_change(&self, next: PaymentStatus) -> Result<(), TransitionError> {
        self.ensure_open()?;
        if next == self.payment_status {
            return Ok(());
        }
        if self.status == OrderStatus::Pending {
            return Err(TransitionError::NotVerified("order"));
        }
        Ok(())
    }

    /// `agent_current_order` is the agent's `current_order_id`
    pub fn check_assignable(
        &self,
        agent_id: i32,
        agent_current_order: Option<i32>,
    ) -> Result<(), TransitionError> {
        self.ensure_open()?;
        if let Some(order_id) = agent_current_order {
            return Err(TransitionError::AgentBusy { agent_id, order_id });
        }
        if let Some(assigned) = self.delivery_agent_id {
            return Err(TransitionError::AlreadyAssigned { agent_id: assigned });
        }
        if self.status != OrderStatus::Verified {
            return Err(TransitionError::NotVerified("order"));
        }
        Ok(())
    }

    pub fn check_cancellable(&self) -> Result<(), TransitionError> {
        self.ensure_open()?;
        match self.status {
            OrderStatus::Pending | OrderStatus::Verified => Ok(()),
            _ => Err(self.not_allowed(OrderStatus::Cancelled)),
        }
    }

    /// Customers may only change an order nobody has acted on yet
    pub fn check_modifiable(&self) -> Result<(), TransitionError> {
        if self.status != OrderStatus::Pending {
            return Err(TransitionError::Rejected(
                "Only orders with \"pending\" status can be modified".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: OrderStatus, payment: PaymentStatus) -> OrderState {
        OrderState {
            status,
            payment_status: payment,
            verification_status: VerificationStatus::Verified,
            delivery_agent_id: Some(1),
        }
    }

    #[test]
    fn test_cannot_deliver_before_payment() {
        let s = state(OrderStatus::Dispatched, PaymentStatus::Pending);
        assert_eq!(
            s.check_delivery_transition(OrderStatus::Delivered),
            Err(TransitionError::PaymentRequired)
        );

        let s = state(OrderStatus::Verified, PaymentStatus::Pending);
        assert_eq!(
            s.check_delivery_transition(OrderStatus::Delivered),
            Err(TransitionError::PaymentRequired)
        );

        let s = state(OrderStatus::Dispatched, PaymentStatus::Paid);
        assert_eq!(s.check_delivery_transition(OrderStatus::Delivered), Ok(()));
    }

    #[test]
    fn test_delivery_must_pass_through_dispatch() {
        let s = state(OrderStatus::Verified, PaymentStatus::Paid);
        assert!(matches!(
            s.check_delivery_transition(OrderStatus::Delivered),
            Err(TransitionError::NotAllowed { .. })
        ));
        assert_eq!(s.check_delivery_transition(OrderStatus::Dispatched), Ok(()));

        let s = state(OrderStatus::Dispatched, PaymentStatus::Paid);
        assert!(s.check_delivery_transition(OrderStatus::Dispatched).is_err());
        assert!(s.check_delivery_transition(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_dispatch_requires_an_agent() {
        let mut s = state(OrderStatus::Verified, PaymentStatus::Pending);
        s.delivery_agent_id = None;
        assert!(s.check_delivery_transition(OrderStatus::Dispatched).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let s = state(status, PaymentStatus::Paid);
            assert!(s.is_terminal());
            assert!(s.check_delivery_transition(OrderStatus::Dispatched).is_err());
            assert!(s.check_payment_change(PaymentStatus::Pending).is_err());
            assert!(s.check_cancellable().is_err());
            assert!(s.apply_verification(VerificationStatus::NotVerified).is_err());
            assert!(s.allowed_next().is_empty());
        }
    }

    #[test]
    fn test_assignment_to_busy_agent_is_rejected() {
        let mut s = state(OrderStatus::Verified, PaymentStatus::Pending);
        s.delivery_agent_id = None;

        assert_eq!(
            s.check_assignable(4, Some(17)),
            Err(TransitionError::AgentBusy {
                agent_id: 4,
                order_id: 17
            })
        );
        assert_eq!(s.check_assignable(4, None), Ok(()));
    }

    #[test]
    fn test_assignment_requires_verified_unassigned_order() {
        let s = state(OrderStatus::Verified, PaymentStatus::Pending);
        assert_eq!(
            s.check_assignable(2, None),
            Err(TransitionError::AlreadyAssigned { agent_id: 1 })
        );

        let mut pending = state(OrderStatus::Pending, PaymentStatus::Pending);
        pending.delivery_agent_id = None;
        assert_eq!(
            pending.check_assignable(2, None),
            Err(TransitionError::NotVerified("order"))
        );
    }

    #[test]
    fn test_verification_moves_lifecycle() {
        let mut s = state(OrderStatus::Pending, PaymentStatus::Pending);
        s.delivery_agent_id = None;
        s.verification_status = VerificationStatus::Pending;

        assert_eq!(
            s.apply_verification(VerificationStatus::Verified),
            Ok(OrderStatus::Verified)
        );
        assert_eq!(
            s.apply_verification(VerificationStatus::NotVerified),
            Ok(OrderStatus::Pending)
        );

        let mut verified = s;
        verified.status = OrderStatus::Verified;
        assert_eq!(
            verified.apply_verification(VerificationStatus::NotVerified),
            Ok(OrderStatus::Pending)
        );

        verified.delivery_agent_id = Some(9);
        assert!(verified
            .apply_verification(VerificationStatus::NotVerified)
            .is_err());

        let dispatched = state(OrderStatus::Dispatched, PaymentStatus::Pending);
        assert!(dispatched
            .apply_verification(VerificationStatus::Verified)
            .is_err());
    }

    #[test]
    fn test_payment_toggles_only_after_verification() {
        let s = state(OrderStatus::Dispatched, PaymentStatus::Pending);
        assert_eq!(s.check_payment_change(PaymentStatus::Paid), Ok(()));

        let paid = state(OrderStatus::Dispatched, PaymentStatus::Paid);
        assert_eq!(paid.check_payment_change(PaymentStatus::Pending), Ok(()));

        let pending = state(OrderStatus::Pending, PaymentStatus::Pending);
        assert!(pending.check_payment_change(PaymentStatus::Paid).is_err());
    }

    #[test]
    fn test_cancel_and_modify_windows() {
        let pending = state(OrderStatus::Pending, PaymentStatus::Pending);
        assert!(pending.check_cancellable().is_ok());
        assert!(pending.check_modifiable().is_ok());

        let verified = state(OrderStatus::Verified, PaymentStatus::Pending);
        assert!(verified.check_cancellable().is_ok());
        assert!(verified.check_modifiable().is_err());

        let dispatched = state(OrderStatus::Dispatched, PaymentStatus::Pending);
        assert!(dispatched.check_cancellable().is_err());
    }

    #[test]
    fn test_allowed_next_follows_guards() {
        let dispatched_unpaid = state(OrderStatus::Dispatched, PaymentStatus::Pending);
        assert!(dispatched_unpaid.allowed_next().is_empty());

        let dispatched_paid = state(OrderStatus::Dispatched, PaymentStatus::Paid);
        assert_eq!(dispatched_paid.allowed_next(), vec![OrderStatus::Delivered]);

        let verified = state(OrderStatus::Verified, PaymentStatus::Pending);
        assert_eq!(
            verified.allowed_next(),
            vec![OrderStatus::Dispatched, OrderStatus::Cancelled]
        );

        let mut pending = state(OrderStatus::Pending, PaymentStatus::Pending);
        pending.verification_status = VerificationStatus::Pending;
        assert_eq!(
            pending.allowed_next(),
            vec![OrderStatus::Verified, OrderStatus::Cancelled]
        );
    }
}
