//! Sample module.

use std::collections::HashMap;

/// A point.
struct Point {
    x: i32,
    y: i32,
}

impl Point {
    fn norm(&self) -> i32 {
        self.x * self.x + self.y * self.y
    }
}

fn main() {
    let mut map = HashMap::new();
    map.insert("a", Point { x: 1, y: 2 });
    inline! {
        fn nested() {
            work();
        }
    }
}
