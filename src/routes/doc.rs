use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginForm, LoginPage, RegisterForm},
        cart::{AddToCartForm, CartLineDto, CartSummary, RemoveFromCartForm},
        orders::OrderView,
        products::ProductList,
    },
    models::{Cart, CartLine, CartProduct, Order, OrderStatus, Product, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, params, products},
    session::SESSION_COOKIE_NAME,
};

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login_page,
        auth::login,
        auth::register,
        auth::logout,
        cart::view_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::order,
        products::list_products,
        products::get_product
    ),
    components(
        schemas(
            User,
            Product,
            Cart,
            CartLine,
            CartProduct,
            Order,
            OrderStatus,
            LoginForm,
            LoginPage,
            RegisterForm,
            AddToCartForm,
            RemoveFromCartForm,
            CartLineDto,
            CartSummary,
            OrderView,
            ProductList,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartSummary>,
            ApiResponse<OrderView>,
            ApiResponse<LoginPage>
        )
    ),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalogue endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout endpoints"),
        (name = "Users", description = "Session login and registration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
