// Selector surface for schema.graphql, in the shape zeroql-codegen emits.
#![allow(dead_code, unused_variables, clippy::all)]

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    ::zeroql::serde::Serialize,
    ::zeroql::serde::Deserialize
)]
#[serde(crate = "::zeroql::serde")]
pub enum Role {
    #[default]
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

#[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
#[serde(crate = "::zeroql::serde")]
pub struct Circle {
    #[serde(rename = "radius", default)]
    pub radius: f64,
}

impl ::zeroql::GraphQLType for Circle {
    const TYPE_NAME: &'static str = "Circle";
}

#[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
#[serde(crate = "::zeroql::serde")]
pub struct Square {
    #[serde(rename = "side", default)]
    pub side: f64,
}

impl ::zeroql::GraphQLType for Square {
    const TYPE_NAME: &'static str = "Square";
}

#[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
#[serde(crate = "::zeroql::serde")]
pub struct Person {
    #[serde(rename = "id", default)]
    pub id: i32,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "role", default)]
    pub role: Option<Role>,
    #[serde(rename = "avatar", default)]
    __avatar: Option<String>,
    #[serde(rename = "friends", default)]
    __friends: Vec<Person>,
}

impl ::zeroql::GraphQLType for Person {
    const TYPE_NAME: &'static str = "Person";
}

impl Person {
    pub fn avatar(&self, size: i32) -> Option<String> {
        self.__avatar.clone()
    }

    pub fn friends<T>(&self, first: Option<i32>, selector: impl Fn(&Person) -> T) -> Vec<T> {
        let value = &self.__friends;
        {
            let l0 = value;
            l0.iter().map(&selector).collect::<Vec<_>>()
        }
    }
}

#[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
#[serde(crate = "::zeroql::serde")]
pub struct Query {
    #[serde(rename = "me", default)]
    __me: Option<Box<Person>>,
    #[serde(rename = "user", default)]
    __user: Option<Box<Person>>,
    #[serde(rename = "shape", default)]
    __shape: Option<Box<Shape>>,
}

impl ::zeroql::GraphQLType for Query {
    const TYPE_NAME: &'static str = "Query";
}

impl Query {
    pub fn me<T>(&self, selector: impl FnOnce(&Person) -> T) -> Option<T> {
        let value = &self.__me;
        value.as_deref().map(selector)
    }

    pub fn user<T>(&self, id: i32, selector: impl FnOnce(&Person) -> T) -> Option<T> {
        let value = &self.__user;
        value.as_deref().map(selector)
    }

    pub fn shape<T>(&self, selector: impl FnOnce(&Shape) -> T) -> Option<T> {
        let value = &self.__shape;
        value.as_deref().map(selector)
    }
}

#[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
#[serde(crate = "::zeroql::serde")]
pub struct Mutation {
    #[serde(rename = "rename", default)]
    __rename: Box<Person>,
}

impl ::zeroql::GraphQLType for Mutation {
    const TYPE_NAME: &'static str = "Mutation";
}

impl Mutation {
    pub fn rename<T>(&self, id: i32, name: &str, selector: impl FnOnce(&Person) -> T) -> T {
        let value = &self.__rename;
        selector(&**value)
    }
}

#[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
#[serde(crate = "::zeroql::serde")]
pub struct ShapeFields {}

impl ::zeroql::GraphQLType for ShapeFields {
    const TYPE_NAME: &'static str = "Shape";
}

pub type Shape = ::zeroql::Polymorphic<ShapeFields>;

/// Client for this schema.
pub type GraphQLClient<T = ::zeroql::HttpTransport> = ::zeroql::Client<Query, Mutation, T>;
