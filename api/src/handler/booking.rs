use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use garde::Validate;

use kernel::model::{
    attachment::AttachmentUpload,
    booking::event::{ApproveBooking, CancelBooking, CreateBooking, RejectBooking},
    id::{BookingId, BuildingId},
    payment::{event::RequestRefund, RefundStatus},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    handler::notify_transition,
    model::booking::{
        BookingListQuery, BookingResponse, CreateBookingRequest, PaginatedBookingResponse,
        RefundBookingRequest, RefundResponse, RejectBookingRequest, SubmittedBookingResponse,
    },
};

// 予約を申請する
pub async fn submit_booking(
    user: AuthorizedUser,
    Path(building_id): Path<BuildingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<SubmittedBookingResponse>)> {
    req.validate(&())?;

    // 添付書類はサイズ・種別チェックを通った場合のみ保存し、参照だけを持ち回る
    let attachment_ref = match req.attachment {
        Some(payload) => {
            let content = general_purpose::STANDARD
                .decode(payload.content.as_bytes())
                .map_err(|_| {
                    AppError::UnprocessableEntity(
                        "attachment: base64 として解釈できません".into(),
                    )
                })?;
            let upload =
                AttachmentUpload::new(payload.file_name, payload.content_type, content)?;
            Some(registry.attachment_store().store(upload).await?)
        }
        None => None,
    };

    let event = CreateBooking::new(
        building_id,
        user.id(),
        req.activity_name,
        req.start_date,
        req.end_date,
        req.start_time,
        req.end_time,
        attachment_ref,
        Local::now().date_naive(),
    )?;

    // ① 衝突チェックと予約・決済（PENDING）の作成。
    //    ここまでが 1 つの SERIALIZABLE トランザクション。
    let transition = registry
        .booking_repository()
        .submit(event, registry.active_hold())
        .await?;

    // ② コミット後にゲートウェイへ支払いハンドルを要求する。
    //    ロックを持ったまま外部 I/O は行わない。
    let payment = registry
        .payment_repository()
        .find_by_booking_id(transition.booking_id)
        .await?;
    let handle = registry
        .payment_gateway()
        .create_payment(payment.amount, &transition.booking_id.to_string())
        .await?;
    registry
        .payment_repository()
        .set_external_ref(payment.payment_id, &handle.external_ref)
        .await?;

    // ③ 遷移イベントを通知する
    notify_transition(&registry, &transition).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmittedBookingResponse {
            booking_id: transition.booking_id,
            status: transition.to,
            payment_url: handle.payment_url,
        }),
    ))
}

// 本人の予約一覧を返す
pub async fn show_my_bookings(
    user: AuthorizedUser,
    Query(query): Query<BookingListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaginatedBookingResponse>> {
    query.validate(&())?;

    // 利用者本人の予約に固定する
    let mut filter = query.filter();
    filter.borrower_id = Some(user.id());

    registry
        .booking_repository()
        .list(filter, query.options())
        .await
        .map(PaginatedBookingResponse::from)
        .map(Json)
}

// 管理者向けの予約一覧（全件・絞り込み可）
pub async fn show_booking_list(
    user: AuthorizedUser,
    Query(query): Query<BookingListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaginatedBookingResponse>> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    query.validate(&())?;

    registry
        .booking_repository()
        .list(query.filter(), query.options())
        .await
        .map(PaginatedBookingResponse::from)
        .map(Json)
}

// 予約の詳細を返す
pub async fn show_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingResponse>> {
    let booking = registry.booking_repository().find_by_id(booking_id).await?;

    // 一般ユーザーは本人の予約のみ閲覧できる
    if !user.is_admin() && booking.borrower_id != user.id() {
        return Err(AppError::ForbiddenOperation);
    }

    Ok(Json(booking.into()))
}

// 管理者が予約を承認する
pub async fn approve_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    let transition = registry
        .booking_repository()
        .approve(
            ApproveBooking::new(booking_id, user.id()),
            registry.active_hold(),
        )
        .await?;

    notify_transition(&registry, &transition).await;
    Ok(StatusCode::OK)
}

// 管理者が予約を却下する（理由つき）
pub async fn reject_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<RejectBookingRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    let transition = registry
        .booking_repository()
        .reject(RejectBooking::new(booking_id, user.id(), req.reason))
        .await?;

    notify_transition(&registry, &transition).await;
    Ok(StatusCode::OK)
}

// 予約を取り消す。承認済み予約の取消は管理者のみ
pub async fn cancel_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    let transition = registry
        .booking_repository()
        .cancel(CancelBooking::new(booking_id, user.id(), user.is_admin()))
        .await?;

    notify_transition(&registry, &transition).await;
    Ok(StatusCode::OK)
}

// 返金を申請する。同じ決済への再申請は既存の返金をそのまま返す
pub async fn request_booking_refund(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<RefundBookingRequest>,
) -> AppResult<Json<RefundResponse>> {
    req.validate(&())?;

    let booking = registry.booking_repository().find_by_id(booking_id).await?;
    if !user.is_admin() && booking.borrower_id != user.id() {
        return Err(AppError::ForbiddenOperation);
    }

    let refund = registry
        .payment_repository()
        .request_refund(RequestRefund::new(booking_id, user.id(), req.reason))
        .await?;

    // 新規受付（PENDING かつ未送信）の場合のみゲートウェイへ依頼する。
    // PROCESSING 以降の返金はここからは動かせず、確定は Webhook 待ち。
    if refund.status == RefundStatus::Pending && refund.external_ref.is_none() {
        let payment = registry
            .payment_repository()
            .find_by_booking_id(booking_id)
            .await?;
        let Some(payment_ref) = payment.external_ref else {
            return Err(AppError::UnprocessableEntity(
                "決済にゲートウェイ参照がないため返金を依頼できません".into(),
            ));
        };

        match registry
            .payment_gateway()
            .create_refund(&payment_ref, refund.amount, &refund.reason)
            .await
        {
            Ok(external_ref) => {
                registry
                    .payment_repository()
                    .mark_refund_processing(refund.refund_id, &external_ref)
                    .await?;
            }
            Err(e) => {
                // リトライ上限まで失敗。返金を FAILED で確定して手動対応へ回す。
                // 予約側の REJECTED / CANCELLED はすでに確定済みなので巻き戻さない。
                registry
                    .payment_repository()
                    .mark_refund_failed(refund.refund_id)
                    .await?;
                return Err(e);
            }
        }

        let refreshed = registry
            .payment_repository()
            .find_refund_by_payment_id(refund.payment_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!(
                    "返金（{}）が見つかりませんでした。",
                    refund.refund_id
                ))
            })?;
        return Ok(Json(refreshed.into()));
    }

    Ok(Json(refund.into()))
}
