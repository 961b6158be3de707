//! Type strings and the numeric promotion hierarchy
//!
//! Types are carried through the compiler as canonical strings:
//! `["unsigned "|"struct "]? base "*"*`, e.g. `int`, `unsigned long`,
//! `struct point*`. Literals start out with the abstract tag
//! [`ANY_NUMBER`] until promotion resolves them.

/// Abstract type tag for numeric literals before promotion.
pub const ANY_NUMBER: &str = "any number";

/// Integral base types, in promotion order.
pub const INTEGRAL_TYPES: [&str; 4] = ["char", "short", "int", "long"];

/// Floating-point base types, in promotion order.
pub const FLOAT_TYPES: [&str; 2] = ["float", "double"];

/// All basic (non-pointer, non-struct) type names.
pub const BASIC_TYPES: [&str; 6] = ["char", "short", "int", "long", "float", "double"];

/// Rank of a type in the promotion hierarchy
/// `any number < char < short < int < long < float < double`.
///
/// Pointer and struct types have no rank and never take part in promotion.
pub fn promotion_rank(ty: &str) -> Option<u8> {
    match ty {
        ANY_NUMBER => Some(0),
        "char" => Some(1),
        "short" => Some(2),
        "int" => Some(3),
        "long" => Some(4),
        "float" => Some(5),
        "double" => Some(6),
        _ => None,
    }
}

pub fn is_integral(ty: &str) -> bool {
    INTEGRAL_TYPES.contains(&ty)
}

pub fn is_basic(ty: &str) -> bool {
    BASIC_TYPES.contains(&ty)
}

pub fn is_pointer(ty: &str) -> bool {
    ty.ends_with('*')
}

/// The pointed-to type of a pointer type string, if it is one.
pub fn pointee(ty: &str) -> Option<&str> {
    ty.strip_suffix('*')
}

/// The pointer type to `ty`.
pub fn pointer_to(ty: &str) -> String {
    format!("{}*", ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_rank_total_order() {
        let order = [ANY_NUMBER, "char", "short", "int", "long", "float", "double"];
        for pair in order.windows(2) {
            assert!(promotion_rank(pair[0]).unwrap() < promotion_rank(pair[1]).unwrap());
        }
    }

    #[test]
    fn test_pointers_have_no_rank() {
        assert_eq!(promotion_rank("int*"), None);
        assert_eq!(promotion_rank("struct point"), None);
        assert_eq!(promotion_rank("unsigned int"), None);
    }

    #[test]
    fn test_pointee_round_trip() {
        assert_eq!(pointee("int*"), Some("int"));
        assert_eq!(pointee("int**"), Some("int*"));
        assert_eq!(pointee("int"), None);
        assert_eq!(pointer_to("char"), "char*");
        assert!(is_pointer("struct point*"));
        assert!(!is_pointer("double"));
    }

    #[test]
    fn test_floats_rank_above_integrals() {
        for float_ty in FLOAT_TYPES {
            for integral_ty in INTEGRAL_TYPES {
                assert!(promotion_rank(float_ty) > promotion_rank(integral_ty));
            }
        }
    }
}
