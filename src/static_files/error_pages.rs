pub fn not_found() -> &'static str {
    "<!DOCTYPE html>
<html lang=\"en\">
<head>
    <meta charset=\"UTF-8\">
    <title>404 Not Found</title>
</head>
<body>
    <h1>404 Not Found</h1>
    <p>The requested page does not exist on this server.</p>
    <a href=\"/\">Back to the home page</a>
</body>
</html>
"
}

pub fn method_not_allowed() -> &'static str {
    "<!DOCTYPE html>
<html lang=\"en\">
<head>
    <meta charset=\"UTF-8\">
    <title>405 Method Not Allowed</title>
</head>
<body>
    <h1>405 Method Not Allowed</h1>
    <p>This server only answers GET requests.</p>
</body>
</html>
"
}
