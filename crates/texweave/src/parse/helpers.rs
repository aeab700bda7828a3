/// Reads one token and matches it against the provided patterns.
///
/// If the token does not match, a recoverable [crate::parse::Error] is reported,
///     the token is returned to the stream and the macro evaluates to `None`.
macro_rules! get_required_element {
    ($stream: expr, $expected: expr, $guidance: expr, $($pat: pat => $result: expr,)+) => {
        match ($stream).next()? {
            Some(token) => match token.value() {
                $(
                    $pat => Some($result),
                )+
                _ => {
                    let err = crate::parse::Error::new($stream.vm(), $expected, Some(token), $guidance);
                    $stream.vm().error(err)?;
                    $stream.back(token);
                    None
                },
            },
            None => {
                let err = crate::parse::Error::new($stream.vm(), $expected, None, $guidance);
                $stream.vm().error(err)?;
                None
            },
        }
    };
}

macro_rules! get_optional_element {
    ($stream: expr, $($pat: pat => $result: expr,)+) => {
        match ($stream).next()? {
            None => None,
            Some(token) => match token.value() {
                $(
                    $pat => Some($result),
                )+
                _ => {
                    $stream.back(token);
                    None
                }
            }
        }
    };
}

macro_rules! get_optional_element_with_token {
    ($stream: expr, $($pat: pat => $result: expr,)+) => {
        match ($stream).next()? {
            None => None,
            Some(token) => match token.value() {
                $(
                    $pat => Some(($result, token)),
                )+
                _ => {
                    $stream.back(token);
                    None
                },
            }
        }
    };
}
