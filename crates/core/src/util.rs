use std::borrow::Cow;

use url::Url;

pub trait UrlExt {
    /// Set `key` to `value`. The first existing occurrence is updated in place and
    /// repeats are dropped; other parameters keep their order.
    fn with_query_param(&self, key: &str, value: &str) -> Url;
}

impl UrlExt for Url {
    fn with_query_param(&self, key: &str, value: &str) -> Url {
        let mut params: Vec<(Cow<str>, Cow<str>)> = self.query_pairs().collect();
        match params.iter().position(|(k, _)| k == key) {
            Some(first) => {
                params[first].1 = Cow::Borrowed(value);
                let mut seen = false;
                params.retain(|(k, _)| k != key || !std::mem::replace(&mut seen, true));
            }
            None => params.push((Cow::Borrowed(key), Cow::Borrowed(value))),
        }

        let mut out = self.clone();
        let mut pairs = out.query_pairs_mut();
        pairs.clear();
        for (k, v) in &params {
            // `?debug` stays `?debug`, not `?debug=`
            if v.is_empty() {
                pairs.append_key_only(k);
            } else {
                pairs.append_pair(k, v);
            }
        }
        drop(pairs);
        out
    }
}
