use super::surface::Person;

#[zeroql::fragment]
pub fn with_avatar(p: &Person, size: i32) -> (String, Option<String>) {
    (p.first_name.clone(), p.avatar(size))
}

pub struct RenameVars {
    pub id: i32,
    pub name: String,
}
