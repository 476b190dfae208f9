//! Server-rendered pages. Every interpolated value goes through [`escape`].

use std::fmt::Write;

use tourbook_auth::User;
use tourbook_infra::TourDetails;
use tourbook_tours::Tour;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn header(viewer: Option<&User>) -> String {
    match viewer {
        Some(user) => format!(
            r#"<nav class="nav nav--user"><a class="nav__el" href="/my-tours">My bookings</a><a class="nav__el" href="/account"><img class="nav__user-img" src="/img/users/{}" alt="Photo of {}"/><span>{}</span></a></nav>"#,
            escape(&user.photo),
            escape(&user.name),
            escape(user.first_name())
        ),
        None => r#"<nav class="nav nav--user"><a class="nav__el" href="/login">Log in</a></nav>"#.to_string(),
    }
}

fn layout(title: &str, viewer: Option<&User>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1.0"/>
<link rel="stylesheet" href="/css/style.css"/>
<title>Tourbook | {title}</title>
</head>
<body>
<header class="header"><nav class="nav nav--tours"><a class="nav__el" href="/">All tours</a></nav>{header}</header>
<main class="main">{body}</main>
<footer class="footer"><p class="footer__copyright">&copy; Tourbook</p></footer>
</body>
</html>"#,
        title = escape(title),
        header = header(viewer),
    )
}

fn tour_card(tour: &Tour) -> String {
    let start = tour
        .start_dates
        .first()
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| "Dates coming soon".to_string());
    let place = tour
        .start_location
        .as_ref()
        .and_then(|l| l.description.as_deref())
        .unwrap_or("");

    format!(
        r#"<div class="card">
<div class="card__header"><img class="card__picture-img" src="/img/tours/{cover}" alt="{name}"/><h3 class="heading-tertirary"><span>{name}</span></h3></div>
<div class="card__details">
<h4 class="card__sub-heading">{difficulty} {duration}-day tour</h4>
<p class="card__text">{summary}</p>
<div class="card__data"><span>{place}</span></div>
<div class="card__data"><span>{start}</span></div>
<div class="card__data"><span>{stops} stops</span></div>
<div class="card__data"><span>{group} people</span></div>
</div>
<div class="card__footer">
<p><span class="card__footer-value">${price}</span> <span class="card__footer-text">per person</span></p>
<p class="card__ratings"><span class="card__footer-value">{average}</span> <span class="card__footer-text">rating ({quantity})</span></p>
<a class="btn btn--green btn--small" href="/tours/{slug}">Details</a>
</div>
</div>"#,
        cover = escape(&tour.image_cover),
        name = escape(&tour.name),
        difficulty = tour.difficulty.as_str(),
        duration = tour.duration,
        summary = escape(&tour.summary),
        place = escape(place),
        start = escape(&start),
        stops = tour.locations.len(),
        group = tour.max_group_size.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
        price = tour.price,
        average = tour.ratings_average,
        quantity = tour.ratings_quantity,
        slug = escape(&tour.slug),
    )
}

pub fn overview(title: &str, tours: &[Tour], viewer: Option<&User>) -> String {
    let cards: String = tours.iter().map(tour_card).collect();
    layout(title, viewer, &format!(r#"<div class="card-container">{cards}</div>"#))
}

pub fn tour_page(details: &TourDetails, viewer: Option<&User>) -> String {
    let tour = &details.tour;
    let mut body = String::new();

    let _ = write!(
        body,
        r#"<section class="section-header"><div class="header__hero"><img class="header__hero-img" src="/img/tours/{cover}" alt="{name}"/></div><div class="heading-box"><h1 class="heading-primary"><span>{name} tour</span></h1><div class="heading-box__group"><span class="heading-box__text">{duration} days</span></div></div></section>"#,
        cover = escape(&tour.image_cover),
        name = escape(&tour.name),
        duration = tour.duration,
    );

    body.push_str(r#"<section class="section-description"><div class="overview-box"><h2 class="heading-secondary ma-bt-lg">Your tour guides</h2>"#);
    for guide in &details.guides {
        let label = match guide.role {
            tourbook_auth::Role::LeadGuide => "Lead guide",
            _ => "Tour guide",
        };
        let _ = write!(
            body,
            r#"<div class="overview-box__detail"><img class="overview-box__img" src="/img/users/{photo}" alt="{name}"/><span class="overview-box__label">{label}</span><span class="overview-box__text">{name}</span></div>"#,
            photo = escape(&guide.photo),
            name = escape(&guide.name),
        );
    }
    let _ = write!(
        body,
        r#"</div><div class="description-box"><h2 class="heading-secondary ma-bt-lg">About {name} tour</h2><p class="description__text">{description}</p></div></section>"#,
        name = escape(&tour.name),
        description = escape(tour.description.as_deref().unwrap_or(&tour.summary)),
    );

    body.push_str(r#"<section class="section-reviews"><div class="reviews">"#);
    for view in &details.reviews {
        let author = view
            .user
            .as_ref()
            .map(|a| escape(&a.name))
            .unwrap_or_else(|| "Former traveller".to_string());
        let _ = write!(
            body,
            r#"<div class="reviews__card"><div class="reviews__avatar"><h6 class="reviews__user">{author}</h6></div><p class="reviews__text">{text}</p><div class="reviews__rating">{stars}</div></div>"#,
            text = escape(&view.review.review),
            stars = "&#9733;".repeat(usize::from(view.review.rating)),
        );
    }
    body.push_str("</div></section>");

    let _ = write!(
        body,
        r#"<section class="section-cta"><div class="cta"><h2 class="heading-secondary">What are you waiting for?</h2><p class="cta__text">{duration} days. 1 adventure. Infinite memories. Make it yours today!</p>{action}</div></section>"#,
        duration = tour.duration,
        action = match viewer {
            Some(_) => format!(
                r#"<button class="btn btn--green span-all-rows" id="book-tour" data-tour-id="{}">Book tour now!</button>"#,
                tour.id
            ),
            None => r#"<a class="btn btn--green span-all-rows" href="/login">Log in to book tour</a>"#.to_string(),
        },
    );

    layout(&format!("{} Tour", tour.name), viewer, &body)
}

pub fn login_page(viewer: Option<&User>) -> String {
    layout(
        "Log into your account",
        viewer,
        r#"<div class="login-form"><h2 class="heading-secondary ma-bt-lg">Log into your account</h2><form class="form form--login"><div class="form__group"><label class="form__label" for="email">Email address</label><input class="form__input" id="email" type="email" placeholder="you@example.com" required/></div><div class="form__group ma-bt-md"><label class="form__label" for="password">Password</label><input class="form__input" id="password" type="password" placeholder="••••••••" required minlength="8"/></div><div class="form__group"><button class="btn btn--green">Login</button></div></form></div>"#,
    )
}

pub fn account_page(user: &User) -> String {
    let body = format!(
        r#"<div class="user-view"><div class="user-view__content"><div class="user-view__form-container"><h2 class="heading-secondary ma-bt-md">Your account settings</h2><form class="form form-user-data"><div class="form__group"><label class="form__label" for="name">Name</label><input class="form__input" id="name" type="text" value="{name}" required/></div><div class="form__group ma-bt-md"><label class="form__label" for="email">Email address</label><input class="form__input" id="email" type="email" value="{email}" required/></div><div class="form__group form__photo-upload"><img class="form__user-photo" src="/img/users/{photo}" alt="User photo"/></div><div class="form__group right"><button class="btn btn--small btn--green">Save settings</button></div></form></div></div></div>"#,
        name = escape(&user.name),
        email = escape(&user.email),
        photo = escape(&user.photo),
    );
    layout("Your account", Some(user), &body)
}

pub fn error_page(message: &str, viewer: Option<&User>) -> String {
    let body = format!(
        r#"<div class="error"><div class="error__title"><h2 class="heading-secondary heading-secondary--error">Uh oh! Something went wrong!</h2><h2 class="error__emoji">&#128546; &#129327;</h2></div><div class="error__msg">{}</div></div>"#,
        escape(message)
    );
    layout("Something went wrong!", viewer, &body)
}
