//! Inner blocks see their own bindings; outer bindings come back afterwards.

use decl_matrix_macros::expand;

#[expand]
fn sums() -> (u32, u32) {
    #[scope]
    let xs = [1, 2];

    let inner = {
        let mut total = 0;
        #[scope]
        let xs = [10, 20, 30];
        #[matrix(x = xs)]
        total += x;
        total
    };

    let mut outer = 0;
    #[matrix(x = xs)]
    outer += x;

    (inner, outer)
}

fn main() {
    assert_eq!(sums(), (60, 3));
}
