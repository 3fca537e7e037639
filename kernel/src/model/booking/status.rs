use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl BookingStatus {
    // スロットを占有しているとみなす既定のステータス集合。
    // 衝突判定には常にこの集合を「引数として」渡す。判定アルゴリズム側には
    // 固定で埋め込まない（運用でチューニングできるようにするため）。
    pub const ACTIVE_HOLD: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Processing,
        BookingStatus::Approved,
        BookingStatus::Completed,
    ];

    pub fn is_active_hold(self) -> bool {
        Self::ACTIVE_HOLD.contains(&self)
    }

    // 遷移表にある組み合わせかを検査する。表にない遷移は
    // StateTransitionError となり、状態は変更されない。
    pub fn ensure_transition(self, to: BookingStatus) -> AppResult<()> {
        use BookingStatus::*;
        let allowed = matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Approved)
                | (Processing, Rejected)
                | (Processing, Cancelled)
                | (Approved, Completed)
                | (Approved, Cancelled)
        );
        if allowed {
            Ok(())
        } else {
            Err(AppError::StateTransitionError {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

// 各遷移がちょうど 1 つ発火させる副作用の種別。
// ステータス更新と同一トランザクションで booking_events に記録される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideEffect {
    PaymentCreated,
    PaymentConfirmed,
    RefundEligible,
    RefundSettled,
    Notify,
}

impl SideEffect {
    pub fn for_transition(from: Option<BookingStatus>, to: BookingStatus) -> Self {
        use BookingStatus::*;
        match (from, to) {
            // 新規作成時は決済レコードの作成がトリガーされる
            (None, Pending) => SideEffect::PaymentCreated,
            (Some(Pending), Processing) => SideEffect::PaymentConfirmed,
            // 却下・取消は返金可否の判定対象になる
            (Some(_), Rejected) | (Some(_), Cancelled) => SideEffect::RefundEligible,
            _ => SideEffect::Notify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_pass() {
        use BookingStatus::*;
        let legal = [
            (Pending, Processing),
            (Pending, Cancelled),
            (Processing, Approved),
            (Processing, Rejected),
            (Processing, Cancelled),
            (Approved, Completed),
            (Approved, Cancelled),
        ];
        for (from, to) in legal {
            assert!(from.ensure_transition(to).is_ok(), "{from} -> {to}");
        }
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        use BookingStatus::*;
        let illegal = [
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, Completed),
            (Processing, Completed),
            (Processing, Pending),
            (Approved, Rejected),
            (Approved, Pending),
            (Rejected, Approved),
            (Completed, Cancelled),
            (Cancelled, Pending),
        ];
        for (from, to) in illegal {
            assert!(
                matches!(
                    from.ensure_transition(to),
                    Err(shared::error::AppError::StateTransitionError { .. })
                ),
                "{from} -> {to} should fail"
            );
        }
    }

    #[test]
    fn active_hold_excludes_rejected_and_cancelled() {
        assert!(BookingStatus::Pending.is_active_hold());
        assert!(BookingStatus::Processing.is_active_hold());
        assert!(BookingStatus::Approved.is_active_hold());
        assert!(BookingStatus::Completed.is_active_hold());
        assert!(!BookingStatus::Rejected.is_active_hold());
        assert!(!BookingStatus::Cancelled.is_active_hold());
    }

    #[test]
    fn each_transition_has_one_side_effect() {
        use BookingStatus::*;
        assert_eq!(
            SideEffect::for_transition(None, Pending),
            SideEffect::PaymentCreated
        );
        assert_eq!(
            SideEffect::for_transition(Some(Pending), Processing),
            SideEffect::PaymentConfirmed
        );
        assert_eq!(
            SideEffect::for_transition(Some(Processing), Rejected),
            SideEffect::RefundEligible
        );
        assert_eq!(
            SideEffect::for_transition(Some(Approved), Cancelled),
            SideEffect::RefundEligible
        );
        assert_eq!(
            SideEffect::for_transition(Some(Processing), Approved),
            SideEffect::Notify
        );
        assert_eq!(
            SideEffect::for_transition(Some(Approved), Completed),
            SideEffect::Notify
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        let s: BookingStatus = "PROCESSING".parse().unwrap();
        assert_eq!(s, BookingStatus::Processing);
        assert_eq!(BookingStatus::Cancelled.to_string(), "CANCELLED");
    }
}
