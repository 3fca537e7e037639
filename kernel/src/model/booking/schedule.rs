use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::model::{
    booking::status::BookingStatus,
    id::{BookingId, UserId},
};

// 1 日あたりの利用時間の下限・上限（分）
pub const MIN_DAILY_MINUTES: i64 = 30;
pub const MAX_DAILY_MINUTES: i64 = 14 * 60;

// 予約が占有する（日付範囲 × 時刻範囲）の区間。
// 複数日予約は、範囲内のすべての日に同じ時刻枠を適用する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Slot {
    pub fn single_day(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_date: date,
            end_date: date,
            start_time,
            end_time,
        }
    }

    // 日付範囲が交差し、かつ時刻範囲が半開区間
    // （start_a < end_b && start_b < end_a）で重なる場合のみ衝突。
    // end_time と start_time がちょうど一致する隣接予約は衝突にならない。
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start_date <= other.end_date
            && other.start_date <= self.end_date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    // 終了日の終了時刻を過ぎたかどうか（完了スイープの判定基準）
    pub fn has_elapsed(&self, today: NaiveDate, now: NaiveTime) -> bool {
        self.end_date < today || (self.end_date == today && self.end_time <= now)
    }
}

// 衝突判定の入力となる既存予約の射影。
// 判定はステータスとスロットにしか依存しないので、予約の全フィールドは持たない。
#[derive(Debug, Clone)]
pub struct BookingHold {
    pub booking_id: BookingId,
    pub borrower_id: UserId,
    pub status: BookingStatus,
    pub slot: Slot,
}

// 候補スロットと衝突する既存予約をすべて返す（管理者向けの診断用）。
// active_hold に含まれないステータスの予約は占有と見なさない。
// 読み取り経路（カレンダー・空き検索）と書き込み経路（予約作成・承認）の
// 両方がこの 1 箇所を唯一の判定根拠として使う。
pub fn find_conflicts<'a>(
    candidate: &Slot,
    existing: &'a [BookingHold],
    active_hold: &[BookingStatus],
) -> Vec<&'a BookingHold> {
    existing
        .iter()
        .filter(|held| active_hold.contains(&held.status))
        .filter(|held| candidate.overlaps(&held.slot))
        .collect()
}

pub fn has_conflict(candidate: &Slot, existing: &[BookingHold], active_hold: &[BookingStatus]) -> bool {
    !find_conflicts(candidate, existing, active_hold).is_empty()
}

// カレンダー 1 日分の表示ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Available,
    Pending,
    Booked,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
}

// 指定の年月について、日付ごとの占有状況を返す。
// APPROVED / COMPLETED がその日に触れていれば booked、
// PENDING / PROCESSING のみなら pending、どちらもなければ available。
pub fn month_availability(
    year: i32,
    month: u32,
    holds: &[BookingHold],
    active_hold: &[BookingStatus],
) -> Vec<DayAvailability> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };

    let mut days = Vec::with_capacity(31);
    let mut date = first;
    while date.month() == month {
        let mut status = DayStatus::Available;
        for held in holds
            .iter()
            .filter(|h| active_hold.contains(&h.status))
            .filter(|h| h.slot.contains_date(date))
        {
            match held.status {
                BookingStatus::Approved | BookingStatus::Completed => {
                    status = DayStatus::Booked;
                    break;
                }
                _ => status = DayStatus::Pending,
            }
        }
        days.push(DayAvailability { date, status });
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    days
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

    fn hold(status: BookingStatus, d: &str, from: &str, to: &str) -> BookingHold {
        BookingHold {
            booking_id: BookingId::new(),
            borrower_id: UserId::new(),
            status,
            slot: Slot::single_day(date(d), time(from), time(to)),
        }
    }

    #[test]
    fn overlapping_time_on_same_day_conflicts() {
        let existing = vec![hold(BookingStatus::Approved, "2024-06-10", "09:00", "11:00")];
        let candidate = Slot::single_day(date("2024-06-10"), time("10:00"), time("12:00"));
        let conflicts = find_conflicts(&candidate, &existing, &BookingStatus::ACTIVE_HOLD);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].booking_id, existing[0].booking_id);
    }

    #[test]
    fn adjacent_slots_do_not_conflict() {
        // 11:00 終了の予約と 11:00 開始の候補は半開区間なので重ならない
        let existing = vec![hold(BookingStatus::Approved, "2024-06-10", "09:00", "11:00")];
        let candidate = Slot::single_day(date("2024-06-10"), time("11:00"), time("12:00"));
        assert!(!has_conflict(
            &candidate,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));

        let before = Slot::single_day(date("2024-06-10"), time("08:00"), time("09:00"));
        assert!(!has_conflict(
            &before,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));
    }

    #[test]
    fn different_dates_do_not_conflict() {
        let existing = vec![hold(BookingStatus::Approved, "2024-06-10", "09:00", "11:00")];
        let candidate = Slot::single_day(date("2024-06-11"), time("09:00"), time("11:00"));
        assert!(!has_conflict(
            &candidate,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));
    }

    #[test]
    fn rejected_and_cancelled_do_not_hold_slots() {
        let existing = vec![
            hold(BookingStatus::Rejected, "2024-06-10", "09:00", "11:00"),
            hold(BookingStatus::Cancelled, "2024-06-10", "09:00", "11:00"),
        ];
        let candidate = Slot::single_day(date("2024-06-10"), time("09:00"), time("11:00"));
        assert!(!has_conflict(
            &candidate,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));
    }

    #[test]
    fn pending_holds_block_by_default_policy() {
        // PENDING / PROCESSING も既定ではソフトロックとして扱う
        let existing = vec![hold(BookingStatus::Pending, "2024-06-10", "09:00", "11:00")];
        let candidate = Slot::single_day(date("2024-06-10"), time("10:00"), time("12:00"));
        assert!(has_conflict(
            &candidate,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));

        // ポリシーを APPROVED のみへ絞れば同じ候補が通る
        assert!(!has_conflict(
            &candidate,
            &existing,
            &[BookingStatus::Approved]
        ));
    }

    #[test]
    fn multi_day_ranges_overlap_when_dates_intersect() {
        let existing = vec![BookingHold {
            booking_id: BookingId::new(),
            borrower_id: UserId::new(),
            status: BookingStatus::Approved,
            slot: Slot {
                start_date: date("2024-06-10"),
                end_date: date("2024-06-12"),
                start_time: time("09:00"),
                end_time: time("11:00"),
            },
        }];
        // 範囲の末日に触れる候補
        let touching = Slot {
            start_date: date("2024-06-12"),
            end_date: date("2024-06-13"),
            start_time: time("10:00"),
            end_time: time("12:00"),
        };
        assert!(has_conflict(
            &touching,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));

        // 日付は重なるが時刻帯が別
        let evening = Slot {
            start_date: date("2024-06-11"),
            end_date: date("2024-06-11"),
            start_time: time("12:00"),
            end_time: time("14:00"),
        };
        assert!(!has_conflict(
            &evening,
            &existing,
            &BookingStatus::ACTIVE_HOLD
        ));
    }

    #[test]
    fn month_availability_classifies_days() {
        let holds = vec![
            hold(BookingStatus::Approved, "2024-06-10", "09:00", "11:00"),
            hold(BookingStatus::Pending, "2024-06-15", "09:00", "11:00"),
            // 同日に PENDING と APPROVED があれば booked が優先
            hold(BookingStatus::Pending, "2024-06-10", "13:00", "14:00"),
            hold(BookingStatus::Cancelled, "2024-06-20", "09:00", "11:00"),
        ];
        let days = month_availability(2024, 6, &holds, &BookingStatus::ACTIVE_HOLD);
        assert_eq!(days.len(), 30);
        assert_eq!(days[9].date, date("2024-06-10"));
        assert_eq!(days[9].status, DayStatus::Booked);
        assert_eq!(days[14].status, DayStatus::Pending);
        assert_eq!(days[19].status, DayStatus::Available);
        assert_eq!(days[0].status, DayStatus::Available);
    }

    #[test]
    fn elapsed_check_uses_end_instant() {
        let slot = Slot::single_day(date("2024-06-10"), time("09:00"), time("11:00"));
        assert!(slot.has_elapsed(date("2024-06-11"), time("00:00")));
        assert!(slot.has_elapsed(date("2024-06-10"), time("11:00")));
        assert!(!slot.has_elapsed(date("2024-06-10"), time("10:59")));
    }
}
