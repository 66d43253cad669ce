use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::Users;

/// SELECT id, username, password FROM users WHERE username = ? LIMIT 1
pub fn select_by_username(username: &str) -> String {
    Query::select()
        .columns([Users::Id, Users::Username, Users::Password])
        .from(Users::Table)
        .and_where(Expr::col(Users::Username).eq(username))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// UPDATE users SET last_login_time = ? WHERE id = ?
pub fn update_last_login(id: i64, last_login_time: &str) -> String {
    Query::update()
        .table(Users::Table)
        .value(Users::LastLoginTime, last_login_time)
        .and_where(Expr::col(Users::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO users (username, password, last_login_time) VALUES (?, ?, NULL)
pub fn insert(username: &str, password_hash: &str) -> String {
    Query::insert()
        .into_table(Users::Table)
        .columns([Users::Username, Users::Password, Users::LastLoginTime])
        .values_panic([
            username.into(),
            password_hash.into(),
            Option::<String>::None.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, username, last_login_time FROM users ORDER BY id DESC
pub fn select_all() -> String {
    Query::select()
        .columns([Users::Id, Users::Username, Users::LastLoginTime])
        .from(Users::Table)
        .order_by(Users::Id, Order::Desc)
        .to_string(SqliteQueryBuilder)
}
