use super::surface::{Mutation, Query};

#[zeroql::request(
    schema = "tests/support/schema.graphql",
    |req, q: &Query| -> Option<String> { q.user(req.id, |u| u.first_name.clone()) }
)]
pub struct GetUserName {
    pub id: i32,
}

#[zeroql::request(
    mutation,
    schema = "tests/support/schema.graphql",
    |req, m: &Mutation| -> String { m.rename(req.id, &req.name, |o| o.first_name.clone()) }
)]
pub struct Rename {
    pub id: i32,
    pub name: String,
}
