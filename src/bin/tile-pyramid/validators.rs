use tile_pyramid::{grid::MAX_ZOOM, Fixture};

pub fn is_numeric_min(min: usize) -> impl Fn(String) -> Result<(), String> {
    move |v: String| {
        let val = v
            .parse::<usize>()
            .map_err(|_| "must be numeric".to_owned())?;

        if val < min {
            return Err(format!("must be >= {}", min));
        }

        Ok(())
    }
}

pub fn is_zoom(v: String) -> Result<(), String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;

    if val > MAX_ZOOM {
        return Err(format!("must be <= {}", MAX_ZOOM));
    }

    Ok(())
}

fn is_in_range(v: String, limit: f64) -> Result<(), String> {
    let val = v.parse::<f64>().map_err(|_| "must be numeric".to_owned())?;

    if val < -limit {
        return Err(format!("must be >= -{}°", limit));
    } else if val > limit {
        return Err(format!("must be <= {}°", limit));
    }

    Ok(())
}

pub fn is_latitude(v: String) -> Result<(), String> {
    is_in_range(v, 90f64)
}

pub fn is_longitude(v: String) -> Result<(), String> {
    is_in_range(v, 180f64)
}

pub fn is_bb_fixture(v: String) -> Result<(), String> {
    v.parse::<Fixture>()
        .map(|_| ())
        .map_err(|_| "invalid fixture".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates() {
        assert!(is_latitude("-21.147418".into()).is_ok());
        assert!(is_latitude("90.5".into()).is_err());
        assert!(is_longitude("-180".into()).is_ok());
        assert!(is_longitude("east".into()).is_err());
    }

    #[test]
    fn zooms_and_counts() {
        assert!(is_zoom("18".into()).is_ok());
        assert!(is_zoom("31".into()).is_err());
        assert!(is_numeric_min(1)("0".into()).is_err());
        assert!(is_numeric_min(0)("0".into()).is_ok());
    }

    #[test]
    fn fixtures() {
        assert!(is_bb_fixture("reunion".into()).is_ok());
        assert!(is_bb_fixture("usa".into()).is_err());
    }
}
