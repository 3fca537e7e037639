use chrono::{NaiveDate, NaiveTime};
use derive_new::new;
use shared::error::{AppError, AppResult};

use crate::model::{
    booking::{
        schedule::{Slot, MAX_DAILY_MINUTES, MIN_DAILY_MINUTES},
        status::{BookingStatus, SideEffect},
    },
    id::{BookingId, BuildingId, UserId},
};

// 予約申請の正規化済みイベント。
// new() がバリデータを兼ねる。ここを通らない限り永続化処理には進まないので、
// 不正な申請が部分的に書き込まれることはない。
#[derive(Debug)]
pub struct CreateBooking {
    pub building_id: BuildingId,
    pub borrower_id: UserId,
    pub activity_name: String,
    pub slot: Slot,
    pub attachment_ref: Option<String>,
}

impl CreateBooking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        building_id: BuildingId,
        borrower_id: UserId,
        activity_name: String,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        start_time: NaiveTime,
        end_time: NaiveTime,
        attachment_ref: Option<String>,
        today: NaiveDate,
    ) -> AppResult<Self> {
        // 終了日の省略時は開始日と同じ（単日予約）
        let end_date = end_date.unwrap_or(start_date);

        // 違反したフィールドごとに 1 件ずつメッセージを集める
        let mut violations: Vec<String> = Vec::new();

        let name_chars = activity_name.chars().count();
        if !(3..=200).contains(&name_chars) {
            violations.push("activityName: 3〜200 文字で入力してください".into());
        }
        if start_date < today {
            violations.push("startDate: 過去の日付は指定できません".into());
        }
        if end_date < start_date {
            violations.push("endDate: 開始日以降の日付を指定してください".into());
        }
        if end_time <= start_time {
            violations.push("endTime: 開始時刻より後の時刻を指定してください".into());
        } else {
            let minutes = (end_time - start_time).num_minutes();
            if !(MIN_DAILY_MINUTES..=MAX_DAILY_MINUTES).contains(&minutes) {
                violations.push(format!(
                    "endTime: 1 日あたりの利用時間は {} 分以上 {} 時間以下にしてください",
                    MIN_DAILY_MINUTES,
                    MAX_DAILY_MINUTES / 60
                ));
            }
        }

        if !violations.is_empty() {
            return Err(AppError::UnprocessableEntity(violations.join("; ")));
        }

        Ok(Self {
            building_id,
            borrower_id,
            activity_name,
            slot: Slot {
                start_date,
                end_date,
                start_time,
                end_time,
            },
            attachment_ref,
        })
    }
}

#[derive(Debug, new)]
pub struct ApproveBooking {
    pub booking_id: BookingId,
    pub approved_by: UserId,
}

#[derive(Debug, new)]
pub struct RejectBooking {
    pub booking_id: BookingId,
    pub rejected_by: UserId,
    pub reason: String,
}

#[derive(Debug, new)]
pub struct CancelBooking {
    pub booking_id: BookingId,
    pub cancelled_by: UserId,
    // 管理者は承認済み予約も開始前なら取り消せる
    pub is_admin: bool,
}

// 確定した状態遷移の記録。リポジトリがコミット後に返し、
// 呼び出し側が通知ディスパッチに使う。
#[derive(Debug, Clone)]
pub struct BookingTransition {
    pub booking_id: BookingId,
    pub borrower_id: UserId,
    pub from: Option<BookingStatus>,
    pub to: BookingStatus,
    pub side_effect: SideEffect,
}

impl BookingTransition {
    pub fn event_type(&self) -> String {
        format!("booking.{}", self.to.as_ref().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn submit(
        name: &str,
        start_date: &str,
        end_date: Option<&str>,
        start_time: &str,
        end_time: &str,
    ) -> AppResult<CreateBooking> {
        CreateBooking::new(
            BuildingId::new(),
            UserId::new(),
            name.into(),
            date(start_date),
            end_date.map(date),
            time(start_time),
            time(end_time),
            None,
            date("2024-06-01"),
        )
    }

    #[test]
    fn valid_request_normalizes_missing_end_date() {
        let event = submit("文化祭リハーサル", "2024-06-10", None, "09:00", "11:00").unwrap();
        assert_eq!(event.slot.end_date, date("2024-06-10"));
        assert_eq!(event.slot.day_count(), 1);
    }

    #[test]
    fn twenty_minute_window_fails() {
        assert!(submit("会議", "2024-06-10", None, "09:00", "09:20").is_err());
    }

    #[test]
    fn fifteen_hour_window_fails() {
        assert!(submit("合宿", "2024-06-10", None, "07:00", "22:00").is_err());
    }

    #[test]
    fn exact_bounds_pass() {
        // ちょうど 30 分・ちょうど 14 時間は許可
        assert!(submit("短時間利用", "2024-06-10", None, "09:00", "09:30").is_ok());
        assert!(submit("終日利用", "2024-06-10", None, "07:00", "21:00").is_ok());
    }

    #[test]
    fn past_start_date_fails() {
        assert!(submit("稽古", "2024-05-31", None, "09:00", "11:00").is_err());
    }

    #[test]
    fn end_date_before_start_date_fails() {
        assert!(submit("展示", "2024-06-10", Some("2024-06-09"), "09:00", "11:00").is_err());
    }

    #[test]
    fn short_activity_name_fails() {
        assert!(submit("あ", "2024-06-10", None, "09:00", "11:00").is_err());
    }

    #[test]
    fn all_violations_are_reported_together() {
        let err = submit("あ", "2024-05-01", Some("2024-04-30"), "11:00", "09:00").unwrap_err();
        let AppError::UnprocessableEntity(message) = err else {
            panic!("unexpected error kind");
        };
        assert!(message.contains("activityName"));
        assert!(message.contains("startDate"));
        assert!(message.contains("endDate"));
        assert!(message.contains("endTime"));
    }
}
