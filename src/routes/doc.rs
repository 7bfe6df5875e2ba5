use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    analytics::{CustomerSpend, Overview, ProductPerformance, StatusCount},
    dto::{
        auth::{
            ChangePasswordRequest, LoginRequest, LoginResponse, Profile, RegisterRequest,
            UpdateProfileRequest,
        },
        cart::{AddToCartRequest, AttachFileRequest, CartLineDto, CartList, UpdateCartRequest},
        feedback::{CreateQuestionnaireRequest, CreateReviewRequest, QuestionnaireList, ReviewList},
        orders::{
            CheckoutRequest, CheckoutResponse, ManualOrderRequest, OrderList,
            UpdateOrderStatusRequest,
        },
        products::{self, CreateProductRequest, InventoryAdjustRequest, LowStockQuery, UpdateProductRequest},
        vouchers::{
            AppliedVoucher, ApplyVoucherRequest, DeleteVoucherRequest, UpsertVoucherRequest,
            UserVouchers, VoucherList,
        },
    },
    error::{ErrorData, ErrorKind},
    handoff::{Branch, HandoffSnapshot},
    models::{
        Attachment, CartItem, DiscoverySource, Order, OrderItem, OrderStatus, PaymentMethod,
        Product, Questionnaire, QuestionnaireAnswers, Review, Role, ServiceSpeed, User,
        VoucherCode,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, feedback, health, orders, params, products as product_routes, vouchers},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::update_profile,
        auth::change_password,
        auth::welcome_voucher_shown,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::clear_cart,
        cart::update_line,
        cart::remove_line,
        cart::update_product_line,
        cart::remove_product,
        cart::attach_file,
        cart::remove_attachment,
        orders::list_order,
        orders::checkout,
        orders::get_order,
        vouchers::list_vouchers,
        vouchers::check_voucher,
        vouchers::apply_voucher,
        feedback::list_reviews,
        feedback::add_review,
        feedback::list_questionnaires,
        feedback::add_questionnaire,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::delete_order,
        admin::add_manual_order,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::overview,
        admin::product_performance,
        admin::list_user_vouchers,
        admin::upsert_voucher,
        admin::delete_voucher
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            Attachment,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            PaymentMethod,
            VoucherCode,
            Review,
            Questionnaire,
            QuestionnaireAnswers,
            DiscoverySource,
            ServiceSpeed,
            Branch,
            HandoffSnapshot,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            Profile,
            UpdateProfileRequest,
            ChangePasswordRequest,
            CreateProductRequest,
            UpdateProductRequest,
            InventoryAdjustRequest,
            LowStockQuery,
            AddToCartRequest,
            UpdateCartRequest,
            AttachFileRequest,
            CartLineDto,
            CartList,
            CheckoutRequest,
            CheckoutResponse,
            OrderList,
            UpdateOrderStatusRequest,
            ManualOrderRequest,
            ApplyVoucherRequest,
            AppliedVoucher,
            VoucherList,
            UpsertVoucherRequest,
            DeleteVoucherRequest,
            UserVouchers,
            CreateReviewRequest,
            CreateQuestionnaireRequest,
            ReviewList,
            QuestionnaireList,
            Overview,
            StatusCount,
            CustomerSpend,
            ProductPerformance,
            ErrorData,
            ErrorKind,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            products::ProductList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<CartList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderList>,
            ApiResponse<Order>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication and profile endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Vouchers", description = "Voucher endpoints"),
        (name = "Feedback", description = "Reviews and questionnaires"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
