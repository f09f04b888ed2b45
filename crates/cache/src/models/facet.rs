use shelf_catalog::models::Author;

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct AuthorProxy {
    #[facet(rename = "s")]
    sort_name: String,
    #[facet(rename = "d", default, skip_serializing_if = Option::is_none)]
    display_name: Option<String>,
}
impl From<&Author> for AuthorProxy {
    fn from(author: &Author) -> Self {
        Self {
            sort_name: author.sort_name.clone(),
            display_name: author.display_name.clone(),
        }
    }
}
impl From<AuthorProxy> for Author {
    fn from(author: AuthorProxy) -> Self {
        Author::new(author.sort_name, author.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_json::{from_str as from_json, to_string as to_json};
    use rstest::rstest;

    fn proxy(sort_name: &str, display_name: Option<&str>) -> AuthorProxy {
        AuthorProxy {
            sort_name: sort_name.to_string(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[rstest]
    #[case(proxy("Austen, Jane", None), r#"{"s":"Austen, Jane"}"#)]
    #[case(proxy("Dodgson, Charles", Some("Lewis Carroll")), r#"{"s":"Dodgson, Charles","d":"Lewis Carroll"}"#)]
    fn author_serialize(#[case] input: AuthorProxy, #[case] expected: &str) {
        assert_eq!(to_json(&input).unwrap(), expected);
    }

    #[rstest]
    #[case(proxy("Austen, Jane", None), r#"{"s":"Austen, Jane"}"#)]
    #[case(proxy("Dodgson, Charles", Some("Lewis Carroll")), r#"{"d":"Lewis Carroll","s":"Dodgson, Charles"}"#)]
    fn author_deserialize(#[case] expected: AuthorProxy, #[case] input: &str) {
        assert_eq!(from_json::<AuthorProxy>(input).unwrap(), expected);
    }

    #[test]
    fn author_list_keeps_order() {
        let input = vec![proxy("Stoker, Bram", None), proxy("Austen, Jane", Some("Jane Austen"))];
        let json = to_json(&input).unwrap();
        assert_eq!(json, r#"[{"s":"Stoker, Bram"},{"s":"Austen, Jane","d":"Jane Austen"}]"#);
        assert_eq!(from_json::<Vec<AuthorProxy>>(&json).unwrap(), input);
    }

    #[test]
    fn display_name_matching_sort_name_is_dropped() {
        let author = Author::from(proxy("Plato", Some("Plato")));
        assert_eq!(author.display_name, None);
    }
}
