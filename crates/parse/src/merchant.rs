/// Payment-rail and bank boilerplate tokens stripped from descriptions
/// before the merchant name is derived.
const BOILERPLATE: &[&str] = &[
    "pos", "upi", "neft", "imps", "rtgs", "ach", "nach", "atw", "nwd", "vps", "ecom", "me",
    "payment", "purchase", "txn", "ref", "visa", "mastercard", "rupay", "pvt", "ltd",
];

/// Derive a short merchant name from raw statement text: drop rail/bank
/// boilerplate and numeric junk, keep the first few meaningful tokens with
/// their original casing.
pub fn derive_merchant(description: &str) -> String {
    let tokens: Vec<String> = description
        .split(|c: char| {
            c.is_whitespace() || c == '*' || c == '/' || c == '-' || c == ':' || c == '@'
        })
        .map(strip_digits)
        .filter(|t| t.len() >= 2)
        .filter(|t| !BOILERPLATE.contains(&t.to_lowercase().as_str()))
        .take(3)
        .collect();

    if tokens.is_empty() {
        description.trim().to_string()
    } else {
        tokens.join(" ")
    }
}

fn strip_digits(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '.' && *c != '#')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_merchant_passes_through() {
        assert_eq!(derive_merchant("Zomato Order"), "Zomato Order");
    }

    #[test]
    fn strips_pos_prefix_and_trailing_numbers() {
        assert_eq!(derive_merchant("POS 412399 BIG BAZAAR MUMBAI"), "BIG BAZAAR MUMBAI");
    }

    #[test]
    fn strips_upi_rail_tokens() {
        assert_eq!(derive_merchant("UPI/zomato@icici/513245/Order"), "zomato icici Order");
    }

    #[test]
    fn truncates_to_first_three_tokens() {
        assert_eq!(
            derive_merchant("AMAZON SELLER SERVICES PRIVATE LIMITED BANGALORE"),
            "AMAZON SELLER SERVICES"
        );
    }

    #[test]
    fn numeric_only_description_falls_back_to_raw() {
        assert_eq!(derive_merchant("123456"), "123456");
    }

    #[test]
    fn star_separated_network_format() {
        assert_eq!(derive_merchant("AMZN*Marketplace*1234"), "AMZN Marketplace");
    }
}
