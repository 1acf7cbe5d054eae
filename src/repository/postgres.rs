use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{
        cart_products::{
            ActiveModel as CartProductActive, Column as CartProductCol, Entity as CartProducts,
            Model as CartProductModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{Cart, CartLine, CartProduct, NewProduct, NewUser, Order, OrderStatus, Product, User},
    repository::{
        CartChange, CartRepository, CartUpdate, OrderRepository, ProductRepository,
        UserRepository, increment_quantity, recalculate,
    },
};

/// SeaORM-backed implementation of every repository trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    orm: OrmConn,
}

impl PgStore {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(user_from_entity))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(Users::find()
            .filter(UserCol::Username.eq(username))
            .one(&self.orm)
            .await?
            .map(user_from_entity))
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        if self.find_by_username(&user.username).await?.is_some() {
            return Err(AppError::BadRequest("Username is already taken".into()));
        }

        let model = UserActive {
            id: Set(Uuid::new_v4()),
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;

        Ok(user_from_entity(model))
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)> {
        let finder = Products::find().order_by_asc(ProdCol::Title);
        let total = finder.clone().count(&self.orm).await?;

        let products = finder
            .limit(limit)
            .offset(offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();

        Ok((products, total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity))
    }

    async fn create(&self, product: NewProduct) -> AppResult<Product> {
        let model = ProductActive {
            id: Set(Uuid::new_v4()),
            title: Set(product.title),
            description: Set(product.description),
            image: Set(product.image),
            price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;

        Ok(product_from_entity(model))
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find(&self, cart_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(Carts::find_by_id(cart_id)
            .one(&self.orm)
            .await?
            .map(cart_from_entity))
    }

    async fn find_latest_for_user(&self, user_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .order_by_desc(CartCol::CreatedAt)
            .one(&self.orm)
            .await?
            .map(cart_from_entity))
    }

    async fn create(&self, user_id: Option<Uuid>) -> AppResult<Cart> {
        let model = CartActive {
            cart_id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            subtotal: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;

        Ok(cart_from_entity(model))
    }

    async fn assign_user(&self, cart_id: Uuid, user_id: Uuid) -> AppResult<Cart> {
        let model = Carts::find_by_id(cart_id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: CartActive = model.into();
        active.user_id = Set(Some(user_id));
        let model = active.update(&self.orm).await?;

        Ok(cart_from_entity(model))
    }

    async fn lines(&self, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
        cart_lines(&self.orm, cart_id).await
    }

    async fn apply_change(
        &self,
        cart_id: Uuid,
        change: CartChange,
        fee_rate: Decimal,
    ) -> AppResult<CartUpdate> {
        let txn = self.orm.begin().await?;

        // Changes to one cart are serialised on its row.
        let mut cart = Carts::find_by_id(cart_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .map(cart_from_entity)
            .ok_or(AppError::NotFound)?;

        let mut line = None;
        let mut removed = 0;
        match change {
            CartChange::Add {
                product_id,
                quantity,
            } => line = Some(upsert_line(&txn, cart_id, product_id, quantity).await?),
            CartChange::Remove { product_id } => {
                removed = CartProducts::delete_many()
                    .filter(
                        Condition::all()
                            .add(CartProductCol::CartId.eq(cart_id))
                            .add(CartProductCol::ProductId.eq(product_id)),
                    )
                    .exec(&txn)
                    .await?
                    .rows_affected;
                if removed == 0 {
                    return Err(AppError::NotFound);
                }
            }
            CartChange::Clear => {
                removed = CartProducts::delete_many()
                    .filter(CartProductCol::CartId.eq(cart_id))
                    .exec(&txn)
                    .await?
                    .rows_affected;
            }
            CartChange::Recalculate => {}
        }

        let lines = cart_lines(&txn, cart_id).await?;
        let mut order = Orders::find()
            .filter(OrderCol::CartId.eq(cart_id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .map(order_from_entity)
            .transpose()?;
        recalculate(&mut cart, &lines, fee_rate, order.as_mut())?;

        Carts::update_many()
            .col_expr(CartCol::Subtotal, Expr::value(cart.subtotal))
            .col_expr(CartCol::Total, Expr::value(cart.total))
            .filter(CartCol::CartId.eq(cart_id))
            .exec(&txn)
            .await?;

        if let Some(order) = &order {
            Orders::update_many()
                .col_expr(OrderCol::Total, Expr::value(order.total))
                .col_expr(
                    OrderCol::UpdatedAt,
                    Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(order.updated_at)),
                )
                .filter(OrderCol::OrderId.eq(order.order_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        Ok(CartUpdate {
            cart,
            lines,
            line,
            removed,
            order,
        })
    }
}

async fn cart_lines<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
    let rows = CartProducts::find()
        .find_also_related(Products)
        .filter(CartProductCol::CartId.eq(cart_id))
        .order_by_asc(CartProductCol::CreatedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, product)| {
            product.map(|product| CartLine {
                product: product_from_entity(product),
                quantity: line.quantity,
            })
        })
        .collect())
}

/// Runs inside the transaction that holds the cart row lock, so the
/// quantity read here is still current when written back.
async fn upsert_line<C: ConnectionTrait>(
    db: &C,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartProduct> {
    if Products::find_by_id(product_id).one(db).await?.is_none() {
        return Err(AppError::BadRequest("product not found".into()));
    }

    let current = CartProducts::find()
        .filter(CartProductCol::CartId.eq(cart_id))
        .filter(CartProductCol::ProductId.eq(product_id))
        .one(db)
        .await?
        .map_or(0, |line| line.quantity);
    let quantity = increment_quantity(current, quantity)?;

    let line = CartProductActive {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: NotSet,
    };

    // The (cart_id, product_id) unique key keeps a single line per product.
    let model = CartProducts::insert(line)
        .on_conflict(
            OnConflict::columns([CartProductCol::CartId, CartProductCol::ProductId])
                .update_column(CartProductCol::Quantity)
                .to_owned(),
        )
        .exec_with_returning(db)
        .await?;

    Ok(cart_product_from_entity(model))
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn find(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(order_id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn find_by_cart(&self, cart_id: Uuid) -> AppResult<Option<Order>> {
        Orders::find()
            .filter(OrderCol::CartId.eq(cart_id))
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn create_for_cart(&self, order: Order) -> AppResult<Order> {
        let cart_id = order.cart_id;
        let active = OrderActive {
            order_id: Set(order.order_id),
            user_id: Set(order.user_id),
            cart_id: Set(order.cart_id),
            status: Set(order.status.as_str().to_string()),
            shipping_total: Set(order.shipping_total),
            total: Set(order.total),
            created_at: Set(order.created_at.into()),
            updated_at: Set(order.updated_at.into()),
        };

        // A concurrent checkout of the same cart loses here and reads the
        // winner's row below.
        Orders::insert(active)
            .on_conflict(OnConflict::column(OrderCol::CartId).do_nothing().to_owned())
            .exec_without_returning(&self.orm)
            .await?;

        self.find_by_cart(cart_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("order for cart {cart_id} vanished after insert"))
        })
    }
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        title: model.title,
        description: model.description,
        image: model.image,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_from_entity(model: CartModel) -> Cart {
    Cart {
        cart_id: model.cart_id,
        user_id: model.user_id,
        subtotal: model.subtotal,
        total: model.total,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_product_from_entity(model: CartProductModel) -> CartProduct {
    CartProduct {
        id: model.id,
        cart_id: model.cart_id,
        product_id: model.product_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = model
        .status
        .parse::<OrderStatus>()
        .map_err(|err| AppError::Internal(err.into()))?;

    Ok(Order {
        order_id: model.order_id,
        user_id: model.user_id,
        cart_id: model.cart_id,
        status,
        shipping_total: model.shipping_total,
        total: model.total,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
