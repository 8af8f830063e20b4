use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::PayOrderRequest,
    dto::payments::{PaymentCallbackRequest, PaymentInitiated, PaymentList},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{OrderStatus, Payment, PaymentMethod, PaymentState},
    payments::ChargeRequest,
    response::{ApiResponse, Meta},
    routes::params::PaymentListQuery,
    services::order_service,
    state::AppState,
};

/// Initiates payment for an unpaid order. Gateway methods go out to the
/// provider; cash on delivery is recorded and waits for an admin to settle it.
pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<PaymentInitiated>> {
    payload.validate()?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(order_id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_status == "paid" {
        return Err(AppError::BadRequest("Order already paid".into()));
    }
    if order_service::parse_status(&order.status)? == OrderStatus::Cancelled {
        return Err(AppError::BadRequest("Order is cancelled".into()));
    }

    let pending = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .filter(PaymentCol::Status.eq(PaymentState::Pending.as_str()))
        .count(&state.orm)
        .await?;
    if pending > 0 {
        return Err(AppError::BadRequest(
            "A payment is already pending for this order".into(),
        ));
    }

    let payment_id = Uuid::new_v4();
    let payment = PaymentActive {
        id: Set(payment_id),
        order_id: Set(order.id),
        user_id: Set(user.user_id),
        method: Set(payload.method.as_str().to_string()),
        amount: Set(order.total_amount),
        currency: Set(state.config.currency.clone()),
        status: Set(PaymentState::Pending.as_str().to_string()),
        provider_ref: Set(None),
        phone: Set(payload.phone.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let (payment, instructions) = if payload.method.uses_gateway() {
        let charge = ChargeRequest {
            reference: payment.id.to_string(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            method: payload.method,
            phone: payload.phone.clone(),
        };

        match state.gateway.initiate(&charge).await {
            Ok(outcome) => {
                let mut active: PaymentActive = payment.into();
                active.provider_ref = Set(Some(outcome.provider_ref));
                active.updated_at = Set(Utc::now().into());
                let payment = active.update(&state.orm).await?;

                // Some rails approve synchronously.
                let payment = if outcome.state == PaymentState::Completed {
                    apply_outcome(state, payment.id, PaymentState::Completed).await?
                } else {
                    payment
                };
                (payment, outcome.instructions)
            }
            Err(err) => {
                let mut active: PaymentActive = payment.into();
                active.status = Set(PaymentState::Failed.as_str().to_string());
                active.updated_at = Set(Utc::now().into());
                active.update(&state.orm).await?;
                return Err(err.into());
            }
        }
    } else {
        (payment, None)
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "payment_initiate",
        Some("payments"),
        Some(serde_json::json!({
            "payment_id": payment.id,
            "order_id": order.id,
            "method": payment.method
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment initiated",
        PaymentInitiated {
            payment: Payment::from(payment),
            instructions,
        },
        Some(Meta::empty()),
    ))
}

/// Latest payment for an order. While it is pending on a gateway rail, the
/// provider is asked again so polling clients converge without a callback.
pub async fn payment_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let order = Orders::find_by_id(order_id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    ensure_owner_or_admin(user, order.user_id)?;

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_desc(PaymentCol::CreatedAt)
        .one(&state.orm)
        .await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let method = parse_method(&payment.method)?;
    let payment = if payment.status == PaymentState::Pending.as_str()
        && method.uses_gateway()
        && payment.provider_ref.is_some()
    {
        refresh_from_provider(state, payment).await?
    } else {
        payment
    };

    Ok(ApiResponse::success(
        "Payment status",
        Payment::from(payment),
        None,
    ))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find_by_id(payment_id).one(&state.orm).await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    ensure_owner_or_admin(user, payment.user_id)?;

    Ok(ApiResponse::success("Payment", Payment::from(payment), None))
}

/// Provider status notification. Authenticated by the shared callback token;
/// a completed payment never regresses, so redelivery is harmless.
pub async fn handle_callback(
    state: &AppState,
    token: Option<&str>,
    payload: PaymentCallbackRequest,
) -> AppResult<ApiResponse<Payment>> {
    if token != Some(state.config.payment.callback_token.as_str()) {
        return Err(AppError::Unauthorized("Invalid callback token".into()));
    }

    let next = payload
        .status
        .parse::<PaymentState>()
        .ok()
        .filter(|s| s.is_final())
        .ok_or_else(|| AppError::BadRequest("Invalid callback status".into()))?;

    let payment_id = Uuid::parse_str(&payload.reference).map_err(|_| AppError::NotFound)?;

    let payment = Payments::find_by_id(payment_id).one(&state.orm).await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(amount) = payload.amount {
        if amount != payment.amount {
            return Err(AppError::BadRequest("Amount mismatch".into()));
        }
    }

    let payment = apply_outcome(state, payment.id, next).await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "payment_callback",
        Some("payments"),
        Some(serde_json::json!({
            "payment_id": payment.id,
            "status": payment.status
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Callback processed",
        Payment::from(payment),
        Some(Meta::empty()),
    ))
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    query: PaymentListQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(PaymentCol::Status.eq(status.clone()));
    }
    if let Some(method) = query.method.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(PaymentCol::Method.eq(method.clone()));
    }

    let finder = Payments::find()
        .filter(condition)
        .order_by_desc(PaymentCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Payment::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(meta),
    ))
}

/// Marks a pending cash-on-delivery payment as collected.
pub async fn settle_cash_payment(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;

    let payment = Payments::find_by_id(payment_id).one(&state.orm).await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if parse_method(&payment.method)? != PaymentMethod::CashOnDelivery {
        return Err(AppError::BadRequest(
            "Only cash on delivery payments can be settled manually".into(),
        ));
    }
    if payment.status != PaymentState::Pending.as_str() {
        return Err(AppError::BadRequest("Payment is not pending".into()));
    }

    let payment = apply_outcome(state, payment.id, PaymentState::Completed).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "payment_settle",
        Some("payments"),
        Some(serde_json::json!({ "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment settled",
        Payment::from(payment),
        Some(Meta::empty()),
    ))
}

/// Re-checks a pending payment against the provider. Provider downtime keeps
/// the stored state instead of failing the read.
async fn refresh_from_provider(
    state: &AppState,
    payment: PaymentModel,
) -> AppResult<PaymentModel> {
    let provider_ref = match payment.provider_ref.as_deref() {
        Some(r) => r,
        None => return Ok(payment),
    };

    match state.gateway.verify(provider_ref).await {
        Ok(PaymentState::Pending) => Ok(payment),
        Ok(outcome) => apply_outcome(state, payment.id, outcome).await,
        Err(err) => {
            tracing::warn!(error = %err, payment_id = %payment.id, "payment verification failed");
            Ok(payment)
        }
    }
}

/// Applies a final provider state under row locks. Completion settles the
/// order (paid, paid_at, pending orders advance to confirmed); a payment that
/// is already completed is left untouched whatever the incoming state says.
async fn apply_outcome(
    state: &AppState,
    payment_id: Uuid,
    desired: PaymentState,
) -> AppResult<PaymentModel> {
    let txn = state.orm.begin().await?;

    let payment = Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let payment = match payment {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let current = payment
        .status
        .parse::<PaymentState>()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid payment state")))?;
    if current == PaymentState::Completed || desired == PaymentState::Pending {
        txn.commit().await?;
        return Ok(payment);
    }

    let now = Utc::now();

    if desired == PaymentState::Completed {
        let order = Orders::find_by_id(payment.order_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("payment without order")))?;

        if order.payment_status != "paid" {
            let status = order_service::parse_status(&order.status)?;
            let next_status = if status.can_transition(OrderStatus::Confirmed) {
                OrderStatus::Confirmed
            } else {
                status
            };

            let mut active: OrderActive = order.into();
            active.payment_status = Set("paid".into());
            active.paid_at = Set(Some(now.into()));
            active.status = Set(next_status.as_str().to_string());
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }
    }

    let mut active: PaymentActive = payment.into();
    active.status = Set(desired.as_str().to_string());
    active.updated_at = Set(now.into());
    let payment = active.update(&txn).await?;

    txn.commit().await?;
    Ok(payment)
}

fn parse_method(method: &str) -> AppResult<PaymentMethod> {
    method
        .parse::<PaymentMethod>()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid payment method: {method}")))
}
