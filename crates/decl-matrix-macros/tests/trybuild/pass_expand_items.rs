//! Scope items bind for the items that follow them.

use decl_matrix_macros::expand_items;

trait Lanes {
    const LANES: usize;
}

struct Simd<T>(T);

expand_items! {
    #[scope]
    const WIDTHS: [usize; 3] = [128, 256, 512];

    /// One impl per register width.
    #[matrix(bits = WIDTHS)]
    impl Lanes for Simd<[u8; bits]> {
        const LANES: usize = bits / 8;
    }
}

fn main() {
    assert_eq!(<Simd<[u8; 128]> as Lanes>::LANES, 16);
    assert_eq!(<Simd<[u8; 512]> as Lanes>::LANES, 64);
}
