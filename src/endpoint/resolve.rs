use crate::endpoint::EndpointDescriptor;
use crate::ResolutionError;

/// Resolves an endpoint descriptor into an absolute URL
///
/// # Resolution Steps
///
/// 1. Replace every `{name}` in the path template with `params[name]`
///    (`{{` and `}}` produce literal braces)
/// 2. Join base and path with exactly one `/`, whatever slashes either side carries
///
/// Parameters that no placeholder refers to are ignored.
///
/// # Examples
///
/// ```
/// use endpoint_collector::endpoint::{resolve_url, EndpointDescriptor};
///
/// let endpoint = EndpointDescriptor::new("posts", "/submolt/{name}/posts")
///     .with_param("name", "general");
/// let url = resolve_url("https://api.example.com/", &endpoint).unwrap();
/// assert_eq!(url, "https://api.example.com/submolt/general/posts");
/// ```
pub fn resolve_url(base_url: &str, endpoint: &EndpointDescriptor) -> Result<String, ResolutionError> {
    let path = fill_template(endpoint)?;

    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    Ok(format!("{}/{}", base, path))
}

fn fill_template(endpoint: &EndpointDescriptor) -> Result<String, ResolutionError> {
    let template = endpoint.path_template.as_str();
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[idx + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| ResolutionError::UnclosedPlaceholder {
                        endpoint: endpoint.name.clone(),
                        template: template.to_string(),
                    })?;
                let name = &rest[..end];

                let value =
                    endpoint
                        .params
                        .get(name)
                        .ok_or_else(|| ResolutionError::MissingParam {
                            endpoint: endpoint.name.clone(),
                            param: name.to_string(),
                        })?;
                out.push_str(&value.to_string());

                // Skip past the placeholder name and its closing brace
                for _ in 0..=name.chars().count() {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
