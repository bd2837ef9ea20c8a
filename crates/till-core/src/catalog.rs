//! # Product Catalog
//!
//! The fixed range the tills sell from, plus the store and till estate.

use crate::money::Money;

/// A product on the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub name: &'static str,
    pub code: &'static str,
    pub price: Money,
    pub category: &'static str,
}

const fn product(
    name: &'static str,
    code: &'static str,
    pence: i64,
    category: &'static str,
) -> Product {
    Product {
        name,
        code,
        price: Money::from_pence(pence),
        category,
    }
}

/// The full catalog, in shelf order.
pub const CATALOG: [Product; 20] = [
    product("Milk", "MILK001", 250, "Dairy"),
    product("Bread", "BREAD001", 120, "Bakery"),
    product("Coffee", "COFFEE001", 399, "Beverages"),
    product("Chicken Breast", "CHICKEN001", 899, "Meat"),
    product("Rice", "RICE001", 299, "Grains"),
    product("Bananas", "BANANA001", 150, "Fruit"),
    product("Eggs", "EGGS001", 299, "Dairy"),
    product("Pasta", "PASTA001", 179, "Grains"),
    product("Tomatoes", "TOMATO001", 249, "Vegetables"),
    product("Cheese", "CHEESE001", 450, "Dairy"),
    product("Yogurt", "YOGURT001", 199, "Dairy"),
    product("Apples", "APPLE001", 299, "Fruit"),
    product("Potatoes", "POTATO001", 349, "Vegetables"),
    product("Onions", "ONION001", 129, "Vegetables"),
    product("Cereal", "CEREAL001", 399, "Breakfast"),
    product("Orange Juice", "OJ001", 279, "Beverages"),
    product("Butter", "BUTTER001", 299, "Dairy"),
    product("Ham", "HAM001", 499, "Deli"),
    product("Lettuce", "LETTUCE001", 199, "Vegetables"),
    product("Cucumber", "CUCUMBER001", 99, "Vegetables"),
];

/// Store ids in the estate.
pub const STORES: [&str; 5] = ["STORE-001", "STORE-002", "STORE-003", "STORE-004", "STORE-005"];

/// Till ids; every store runs the same numbering.
pub const TILLS: [&str; 8] = [
    "TILL-1", "TILL-2", "TILL-3", "TILL-4", "TILL-5", "TILL-6", "TILL-7", "TILL-8",
];
