use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginPage {
    pub next: String,
}
