use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use vastra_commerce_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddCartItemRequest,
        orders::{
            CancelItemsRequest, CancelOrderRequest, CancelRole, CheckoutRequest, CheckoutResponse,
            RefundMethod, RefundType, ReturnItemRequest,
        },
    },
    entity::{
        addresses::ActiveModel as AddressActive,
        categories::ActiveModel as CategoryActive,
        enums::{OrderItemStatus, OrderStatus, PaymentMethod, PaymentStatus, RefundStatus},
        order_items::{ActiveModel as OrderItemActive, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders},
        product_variants::{ActiveModel as VariantActive, Entity as ProductVariants},
        products::ActiveModel as ProductActive,
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::AppError,
    gateway::{
        GatewayCharge, GatewayError, GatewayOrder, GatewayPayout, GatewayRefund,
        MockPaymentGateway,
    },
    middleware::auth::{AuthUser, CartOwner},
    services::{admin_service, cart_service, order_service},
    state::AppState,
};

#[tokio::test]
async fn cod_checkout_freezes_prices_and_decrements_stock() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, white_l) = seed_catalog(&state, buyer.user_id).await?;

    add_to_cart(&state, &buyer, black_m.id, 2).await?;
    add_to_cart(&state, &buyer, white_l.id, 1).await?;

    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    // 2 x 500 + 1 x 300
    assert_eq!(data.order.total_amount, dec!(1300));
    assert_eq!(data.order.status, OrderStatus::Pending);
    assert_eq!(data.items.len(), 2);
    for item in &data.items {
        assert_eq!(item.status, OrderItemStatus::Pending);
    }

    // COD never touches the gateway.
    assert_eq!(data.payment.status, PaymentStatus::Pending);
    assert!(data.payment.gateway_order_id.is_none());
    assert!(data.payment.gateway_payment_id.is_none());

    let cart = cart_service::view_cart(&state, CartOwner::User(buyer.user_id))
        .await?
        .data
        .expect("cart view");
    assert!(cart.items.is_empty());

    assert_eq!(stock_of(&state, black_m.id).await?, 8);
    assert_eq!(stock_of(&state, white_l.id).await?, 3);
    Ok(())
}

#[tokio::test]
async fn failed_capture_rolls_back_the_order_and_keeps_the_cart() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway
        .expect_capture_payment()
        .returning(|_, _| Err(GatewayError::NotCaptured { status: "failed".into() }));

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 2).await?;

    let err = order_service::checkout(
        &state,
        &buyer,
        CheckoutRequest { payment_method: PaymentMethod::Razorpay },
    )
    .await
    .expect_err("capture failure must surface");
    assert!(matches!(err, AppError::Upstream(_)));

    // Compensating rollback: no order, stock restored, cart untouched.
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(buyer.user_id))
        .all(&state.orm)
        .await?;
    assert!(orders.is_empty());
    assert_eq!(stock_of(&state, black_m.id).await?, 10);

    let cart = cart_service::view_cart(&state, CartOwner::User(buyer.user_id))
        .await?
        .data
        .expect("cart view");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    Ok(())
}

#[tokio::test]
async fn successful_prepaid_checkout_completes_the_payment() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 2).await?;

    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;
    assert_eq!(data.payment.status, PaymentStatus::Completed);
    assert_eq!(data.payment.gateway_order_id.as_deref(), Some("order_test"));
    assert_eq!(data.payment.gateway_payment_id.as_deref(), Some("pay_test"));

    let cart = cart_service::view_cart(&state, CartOwner::User(buyer.user_id))
        .await?
        .data
        .expect("cart view");
    assert!(cart.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn checkout_requires_verified_email_and_phone() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;

    let request = || CheckoutRequest {
        payment_method: PaymentMethod::CashOnDelivery,
    };

    set_verification(&state, buyer.user_id, false, true).await?;
    let err = order_service::checkout(&state, &buyer, request())
        .await
        .expect_err("unverified email must block checkout");
    match err {
        AppError::Unauthorized(message) => assert_eq!(message, "Please verify your email"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }

    set_verification(&state, buyer.user_id, true, false).await?;
    let err = order_service::checkout(&state, &buyer, request())
        .await
        .expect_err("unverified phone must block checkout");
    match err {
        AppError::Unauthorized(message) => assert_eq!(message, "Please verify your phone"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }

    set_verification(&state, buyer.user_id, true, true).await?;
    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;
    assert_eq!(data.order.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn buyer_cancellation_refunds_a_completed_payment() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    gateway
        .expect_refund_payment()
        .withf(|payment_id, amount| payment_id == "pay_test" && *amount == dec!(1000))
        .returning(|_, _| {
            Ok(GatewayRefund {
                id: "rfnd_test".into(),
                status: "processed".into(),
            })
        });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 2).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;

    let outcome = order_service::cancel_order(
        &state,
        &buyer,
        data.order.id,
        CancelOrderRequest {
            role: CancelRole::Buyer,
            reason: Some("wrong size".into()),
        },
    )
    .await?
    .data
    .expect("cancel outcome");

    assert_eq!(outcome.status, OrderStatus::Cancelled);
    assert_eq!(
        outcome.cancellation_reason.as_deref(),
        Some("Cancelled by buyer: wrong size")
    );
    assert_eq!(outcome.refund_status, Some(RefundStatus::Processed));
    Ok(())
}

#[tokio::test]
async fn refund_failure_leaves_the_order_untouched() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    gateway.expect_refund_payment().returning(|_, _| {
        Err(GatewayError::Failed {
            operation: "Refund".into(),
            status: "failed".into(),
        })
    });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;

    let err = order_service::cancel_order(
        &state,
        &buyer,
        data.order.id,
        CancelOrderRequest {
            role: CancelRole::Buyer,
            reason: Some("wrong size".into()),
        },
    )
    .await
    .expect_err("refund failure must surface");
    assert!(matches!(err, AppError::Upstream(_)));

    let order = Orders::find_by_id(data.order.id)
        .one(&state.orm)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.cancellation_reason.is_none());
    assert!(order.refund_status.is_none());
    Ok(())
}

#[tokio::test]
async fn cancelling_twice_is_a_conflict() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    let request = || CancelOrderRequest {
        role: CancelRole::Buyer,
        reason: Some("changed my mind".into()),
    };
    order_service::cancel_order(&state, &buyer, data.order.id, request()).await?;
    let err = order_service::cancel_order(&state, &buyer, data.order.id, request())
        .await
        .expect_err("second cancel must fail");
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn cancel_items_rejects_ids_from_another_order() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, white_l) = seed_catalog(&state, buyer.user_id).await?;

    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let first = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;
    add_to_cart(&state, &buyer, white_l.id, 1).await?;
    let second = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    let err = order_service::cancel_order_items(
        &state,
        &buyer,
        first.order.id,
        CancelItemsRequest {
            item_ids: vec![first.items[0].id, second.items[0].id],
            reason: "changed my mind".into(),
        },
    )
    .await
    .expect_err("foreign item id must be rejected");
    assert!(matches!(err, AppError::NotFound(_)));

    // All-or-nothing: neither item changed.
    for id in [first.items[0].id, second.items[0].id] {
        let item = OrderItems::find_by_id(id).one(&state.orm).await?.expect("item");
        assert_eq!(item.status, OrderItemStatus::Pending);
    }
    Ok(())
}

#[tokio::test]
async fn cancelling_every_item_cancels_the_order() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, white_l) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 2).await?;
    add_to_cart(&state, &buyer, white_l.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    let first_item = data
        .items
        .iter()
        .find(|i| i.product_variant_id == black_m.id)
        .expect("item");
    let outcome = order_service::cancel_order_items(
        &state,
        &buyer,
        data.order.id,
        CancelItemsRequest {
            item_ids: vec![first_item.id],
            reason: "wrong color".into(),
        },
    )
    .await?
    .data
    .expect("cancel outcome");
    assert_eq!(outcome.status, OrderStatus::Pending);

    let second_item = data
        .items
        .iter()
        .find(|i| i.product_variant_id == white_l.id)
        .expect("item");
    let outcome = order_service::cancel_order_items(
        &state,
        &buyer,
        data.order.id,
        CancelItemsRequest {
            item_ids: vec![second_item.id],
            reason: "wrong color".into(),
        },
    )
    .await?
    .data
    .expect("cancel outcome");
    assert_eq!(outcome.status, OrderStatus::Cancelled);
    assert_eq!(
        outcome.cancellation_reason.as_deref(),
        Some("All items cancelled: wrong color")
    );
    Ok(())
}

#[tokio::test]
async fn cancelled_items_refund_their_stored_prices() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    // The stored price of the cancelled item, not the order total.
    gateway
        .expect_refund_payment()
        .withf(|payment_id, amount| payment_id == "pay_test" && *amount == dec!(500))
        .times(1)
        .returning(|_, _| {
            Ok(GatewayRefund {
                id: "rfnd_test".into(),
                status: "processed".into(),
            })
        });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, white_l) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    add_to_cart(&state, &buyer, white_l.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;

    let item = data
        .items
        .iter()
        .find(|i| i.product_variant_id == black_m.id)
        .expect("item");
    let outcome = order_service::cancel_order_items(
        &state,
        &buyer,
        data.order.id,
        CancelItemsRequest {
            item_ids: vec![item.id],
            reason: "wrong color".into(),
        },
    )
    .await?
    .data
    .expect("cancel outcome");

    assert_eq!(outcome.status, OrderStatus::Pending);
    assert_eq!(outcome.refund_status, Some(RefundStatus::Processed));
    Ok(())
}

#[tokio::test]
async fn item_refund_failure_surfaces_as_upstream() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    gateway.expect_refund_payment().returning(|_, _| {
        Err(GatewayError::Failed {
            operation: "Refund".into(),
            status: "failed".into(),
        })
    });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, white_l) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    add_to_cart(&state, &buyer, white_l.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;

    let err = order_service::cancel_order_items(
        &state,
        &buyer,
        data.order.id,
        CancelItemsRequest {
            item_ids: vec![data.items[0].id],
            reason: "wrong color".into(),
        },
    )
    .await
    .expect_err("refund failure must surface");
    assert!(matches!(err, AppError::Upstream(_)));

    let order = Orders::find_by_id(data.order.id)
        .one(&state.orm)
        .await?
        .expect("order");
    assert!(order.refund_status.is_none());
    Ok(())
}

#[tokio::test]
async fn cancelling_an_item_twice_is_a_conflict() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    // Exactly one refund, even when the same item id is resubmitted.
    gateway.expect_refund_payment().times(1).returning(|_, _| {
        Ok(GatewayRefund {
            id: "rfnd_test".into(),
            status: "processed".into(),
        })
    });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, white_l) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    add_to_cart(&state, &buyer, white_l.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;

    let request = || CancelItemsRequest {
        item_ids: vec![data.items[0].id],
        reason: "wrong color".into(),
    };
    order_service::cancel_order_items(&state, &buyer, data.order.id, request()).await?;
    let err = order_service::cancel_order_items(&state, &buyer, data.order.id, request())
        .await
        .expect_err("re-cancelling must be rejected");
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn returns_respect_the_seven_day_window() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    let request = || ReturnItemRequest {
        product_variant_id: black_m.id,
        reason: "does not fit".into(),
        refund_method: RefundMethod::Replacement,
        refund_type: None,
        upi_id: None,
    };

    // Delivered 8 days ago: outside the window.
    set_item_delivered(&state, data.items[0].id, 8).await?;
    let err = order_service::return_item(&state, &buyer, data.order.id, request())
        .await
        .expect_err("stale delivery must be rejected");
    assert!(matches!(err, AppError::NotFound(_)));

    // Delivered 6 days ago: inside the window.
    set_item_delivered(&state, data.items[0].id, 6).await?;
    let response = order_service::return_item(&state, &buyer, data.order.id, request()).await?;
    assert_eq!(response.message, "Replacement processed");

    let item = OrderItems::find_by_id(data.items[0].id)
        .one(&state.orm)
        .await?
        .expect("item");
    assert_eq!(item.status, OrderItemStatus::Returned);
    Ok(())
}

#[tokio::test]
async fn returned_item_refunds_via_razorpay() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    gateway
        .expect_refund_payment()
        .withf(|payment_id, amount| payment_id == "pay_test" && *amount == dec!(500))
        .times(1)
        .returning(|_, _| {
            Ok(GatewayRefund {
                id: "rfnd_test".into(),
                status: "processed".into(),
            })
        });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;
    set_item_delivered(&state, data.items[0].id, 2).await?;

    let response = order_service::return_item(
        &state,
        &buyer,
        data.order.id,
        ReturnItemRequest {
            product_variant_id: black_m.id,
            reason: "does not fit".into(),
            refund_method: RefundMethod::Refund,
            refund_type: Some(RefundType::Razorpay),
            upi_id: None,
        },
    )
    .await?;
    assert_eq!(response.message, "Refund processed via Razorpay");

    let item = OrderItems::find_by_id(data.items[0].id)
        .one(&state.orm)
        .await?
        .expect("item");
    assert_eq!(item.status, OrderItemStatus::Returned);
    Ok(())
}

#[tokio::test]
async fn bank_refunds_require_a_upi_id() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    gateway
        .expect_payout_to_bank()
        .withf(|beneficiary, amount| beneficiary.vpa == "shopper@bank" && *amount == dec!(500))
        .times(1)
        .returning(|_, _| {
            Ok(GatewayPayout {
                id: "pout_test".into(),
                status: "processed".into(),
            })
        });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;
    set_item_delivered(&state, data.items[0].id, 2).await?;

    let request = |upi_id: Option<String>| ReturnItemRequest {
        product_variant_id: black_m.id,
        reason: "does not fit".into(),
        refund_method: RefundMethod::Refund,
        refund_type: Some(RefundType::Bank),
        upi_id,
    };

    let err = order_service::return_item(&state, &buyer, data.order.id, request(None))
        .await
        .expect_err("bank refund without a UPI id must be rejected");
    assert!(matches!(err, AppError::Validation(_)));

    let response = order_service::return_item(
        &state,
        &buyer,
        data.order.id,
        request(Some("shopper@bank".into())),
    )
    .await?;
    assert_eq!(response.message, "Refund processed via UPI bank transfer");
    Ok(())
}

#[tokio::test]
async fn returned_item_refunds_to_wallet() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_order()
        .returning(|_, _| Ok(GatewayOrder { id: "order_test".into() }));
    gateway.expect_capture_payment().returning(|_, _| {
        Ok(GatewayCharge {
            id: "pay_test".into(),
            status: "captured".into(),
        })
    });
    gateway
        .expect_credit_wallet()
        .withf(|payment_id, amount| payment_id == "pay_test" && *amount == dec!(500))
        .times(1)
        .returning(|_, _| {
            Ok(GatewayRefund {
                id: "rfnd_test".into(),
                status: "processed".into(),
            })
        });

    let state = setup_state(&database_url, gateway).await?;
    let buyer = seed_buyer(&state).await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::Razorpay).await?;
    set_item_delivered(&state, data.items[0].id, 2).await?;

    let response = order_service::return_item(
        &state,
        &buyer,
        data.order.id,
        ReturnItemRequest {
            product_variant_id: black_m.id,
            reason: "does not fit".into(),
            refund_method: RefundMethod::Refund,
            refund_type: Some(RefundType::Wallet),
            upi_id: None,
        },
    )
    .await?;
    assert_eq!(response.message, "Refund processed to wallet");
    Ok(())
}

#[tokio::test]
async fn admin_status_updates_follow_the_transition_table() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let admin = seed_user(&state, "admin").await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    use vastra_commerce_api::routes::admin::UpdateOrderStatusRequest;

    let err = admin_service::update_order_status(
        &state,
        &buyer,
        data.order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Shipped },
    )
    .await
    .expect_err("non-admin must be rejected");
    assert!(matches!(err, AppError::Forbidden));

    admin_service::update_order_status(
        &state,
        &admin,
        data.order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Shipped },
    )
    .await?;

    let err = admin_service::update_order_status(
        &state,
        &admin,
        data.order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Pending },
    )
    .await
    .expect_err("backwards transition must be rejected");
    assert!(matches!(err, AppError::Conflict(_)));

    admin_service::update_order_status(
        &state,
        &admin,
        data.order.id,
        UpdateOrderStatusRequest { status: OrderStatus::Delivered },
    )
    .await?;

    // Delivery fans out to the items.
    let item = OrderItems::find_by_id(data.items[0].id)
        .one(&state.orm)
        .await?
        .expect("item");
    assert_eq!(item.status, OrderItemStatus::Delivered);
    Ok(())
}

#[tokio::test]
async fn three_failed_deliveries_enable_auto_cancel() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, MockPaymentGateway::new()).await?;
    let buyer = seed_buyer(&state).await?;
    let admin = seed_user(&state, "admin").await?;
    let (black_m, _) = seed_catalog(&state, buyer.user_id).await?;
    add_to_cart(&state, &buyer, black_m.id, 1).await?;
    let data = checkout(&state, &buyer, PaymentMethod::CashOnDelivery).await?;

    let auto_cancel = || CancelOrderRequest {
        role: CancelRole::Auto,
        reason: None,
    };

    let err = order_service::cancel_order(&state, &buyer, data.order.id, auto_cancel())
        .await
        .expect_err("auto cancel needs failed attempts first");
    assert!(matches!(err, AppError::Validation(_)));

    for _ in 0..3 {
        admin_service::record_delivery_attempt(&state, &admin, data.order.id).await?;
    }

    let outcome = order_service::cancel_order(&state, &buyer, data.order.id, auto_cancel())
        .await?
        .data
        .expect("cancel outcome");
    assert_eq!(outcome.status, OrderStatus::Cancelled);
    assert_eq!(
        outcome.cancellation_reason.as_deref(),
        Some("Auto-cancelled due to 3 failed delivery attempts")
    );
    Ok(())
}

// --- helpers ---------------------------------------------------------------

fn test_database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(database_url: &str, gateway: MockPaymentGateway) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState {
        pool,
        orm,
        gateway: Arc::new(gateway),
    })
}

/// Inserts a verified user. Tests run concurrently against one database,
/// so every row gets a unique suffix instead of truncating tables.
async fn seed_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let suffix = Uuid::new_v4().simple().to_string();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(format!("{role}_{}", &suffix[..12])),
        email: Set(format!("{role}-{suffix}@example.com")),
        password_hash: Set("not-a-real-hash".into()),
        first_name: Set("Test".into()),
        last_name: Set("Shopper".into()),
        phone: Set(format!("+91-{}", &suffix[..10])),
        role: Set(role.into()),
        email_verified: Set(true),
        phone_verified: Set(true),
        email_verification_token: Set(None),
        email_verification_expires_at: Set(None),
        phone_verification_code: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

async fn set_verification(
    state: &AppState,
    user_id: Uuid,
    email: bool,
    phone: bool,
) -> anyhow::Result<()> {
    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .expect("user");
    let mut active: UserActive = user.into();
    active.email_verified = Set(email);
    active.phone_verified = Set(phone);
    active.update(&state.orm).await?;
    Ok(())
}

/// A buyer with the shipping address checkout requires.
async fn seed_buyer(state: &AppState) -> anyhow::Result<AuthUser> {
    let buyer = seed_user(state, "user").await?;
    AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(buyer.user_id),
        street: Set("42 MG Road".into()),
        city: Set("Bengaluru".into()),
        state: Set("Karnataka".into()),
        postal_code: Set("560001".into()),
        country: Set("India".into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(buyer)
}

/// One product with two variants: 500 rupees / stock 10 and 300 rupees / stock 4.
async fn seed_catalog(
    state: &AppState,
    created_by: Uuid,
) -> anyhow::Result<(
    vastra_commerce_api::entity::product_variants::Model,
    vastra_commerce_api::entity::product_variants::Model,
)> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Tees {}", Uuid::new_v4().simple())),
        description: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(category.id),
        name: Set("Classic Crew Tee".into()),
        description: Set("Plain cotton tee".into()),
        garment_type: Set("T-Shirt".into()),
        care: Set("Machine wash cold".into()),
        created_by: Set(created_by),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let black_m = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set("M".into()),
        color: Set("Black".into()),
        fit: Set("Regular".into()),
        mrp: Set(dec!(500)),
        stock_quantity: Set(10),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let white_l = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set("L".into()),
        color: Set("White".into()),
        fit: Set("Regular".into()),
        mrp: Set(dec!(300)),
        stock_quantity: Set(4),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok((black_m, white_l))
}

async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_variant_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_item(
        state,
        CartOwner::User(user.user_id),
        AddCartItemRequest {
            product_variant_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payment_method: PaymentMethod,
) -> anyhow::Result<CheckoutResponse> {
    let response = order_service::checkout(state, user, CheckoutRequest { payment_method }).await?;
    Ok(response.data.expect("checkout data"))
}

async fn stock_of(state: &AppState, variant_id: Uuid) -> anyhow::Result<i32> {
    let variant = ProductVariants::find_by_id(variant_id)
        .one(&state.orm)
        .await?
        .expect("variant");
    Ok(variant.stock_quantity)
}

/// Marks an item delivered `days_ago`, backdating `updated_at` so the
/// return window can be exercised.
async fn set_item_delivered(
    state: &AppState,
    item_id: Uuid,
    days_ago: i64,
) -> anyhow::Result<()> {
    let item = OrderItems::find_by_id(item_id)
        .one(&state.orm)
        .await?
        .expect("item");
    let mut active: OrderItemActive = item.into();
    active.status = Set(OrderItemStatus::Delivered);
    active.updated_at = Set((Utc::now() - Duration::days(days_ago)).into());
    active.update(&state.orm).await?;
    Ok(())
}
