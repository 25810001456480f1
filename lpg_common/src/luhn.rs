/// Validates `number` against the Luhn mod-10 checksum.
///
/// The string must be non-empty and consist solely of ASCII digits; anything else fails validation rather than
/// panicking, so this can be called directly on untrusted input.
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in number.chars().rev().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        let digit = if i % 2 == 1 {
            let doubled = digit * 2;
            if doubled > 9 {
                doubled - 9
            } else {
                doubled
            }
        } else {
            digit
        };
        sum += digit;
    }
    sum % 10 == 0
}
