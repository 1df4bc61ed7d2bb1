//! Plain function composition for infallible transformations.
//!
//! Use these for steps that cannot fail; fallible chains belong in a
//! [`Pipeline`](crate::Pipeline).

/// Left to right: `pipe(f, g)(x) == g(f(x))`.
pub fn pipe<A, B, C>(f: impl Fn(A) -> B, g: impl Fn(B) -> C) -> impl Fn(A) -> C {
    move |x| g(f(x))
}

/// Right to left: `compose(f, g)(x) == f(g(x))`.
pub fn compose<A, B, C>(f: impl Fn(B) -> C, g: impl Fn(A) -> B) -> impl Fn(A) -> C {
    move |x| f(g(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_and_compose_agree() {
        let trim = |s: String| s.trim().to_string();
        let shout = |s: String| s.to_uppercase();

        let piped = pipe(trim, shout);
        let composed = compose(shout, trim);

        assert_eq!(piped("  hi ".to_string()), "HI");
        assert_eq!(composed("  hi ".to_string()), "HI");
    }

    #[test]
    fn test_nested_pipe() {
        let f = pipe(pipe(|x: i32| x + 1, |x: i32| x * 10), |x: i32| x.to_string());
        assert_eq!(f(4), "50");
    }
}
