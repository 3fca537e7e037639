use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use shared::error::AppResult;

use crate::model::{
    booking::{
        event::{ApproveBooking, BookingTransition, CancelBooking, CreateBooking, RejectBooking},
        schedule::{DayAvailability, Slot},
        Booking, BookingFilter, BookingStatus,
    },
    building::Building,
    id::{BookingId, BuildingId},
    list::{ListOptions, PaginatedList},
};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    // 予約を申請する。衝突チェックと書き込みは 1 つの
    // SERIALIZABLE トランザクションで行い、決済レコード（PENDING）も同時に作る
    async fn submit(
        &self,
        event: CreateBooking,
        active_hold: &[BookingStatus],
    ) -> AppResult<BookingTransition>;
    // booking_id から予約を取得する（決済・返金を含む）
    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking>;
    // 絞り込み＋ページネーション付きの一覧取得
    async fn list(
        &self,
        filter: BookingFilter,
        options: ListOptions,
    ) -> AppResult<PaginatedList<Booking>>;
    // 管理者承認。現在の占有状況に対して衝突チェックをやり直してから確定する
    async fn approve(
        &self,
        event: ApproveBooking,
        active_hold: &[BookingStatus],
    ) -> AppResult<BookingTransition>;
    // 管理者却下（理由つき）
    async fn reject(&self, event: RejectBooking) -> AppResult<BookingTransition>;
    // 利用者または管理者による取消
    async fn cancel(&self, event: CancelBooking) -> AppResult<BookingTransition>;
    // 終了時刻を過ぎた APPROVED の予約を COMPLETED に倒す（定期スイープから呼ぶ）
    async fn complete_elapsed(
        &self,
        today: NaiveDate,
        now: NaiveTime,
    ) -> AppResult<Vec<BookingTransition>>;
    // 指定の建物の月間カレンダーを返す
    async fn month_schedule(
        &self,
        building_id: BuildingId,
        year: i32,
        month: u32,
        active_hold: &[BookingStatus],
    ) -> AppResult<Vec<DayAvailability>>;
    // 指定の日付・時間帯に衝突のない建物を横断検索する
    async fn search_available_buildings(
        &self,
        slot: Slot,
        active_hold: &[BookingStatus],
    ) -> AppResult<Vec<Building>>;
}
